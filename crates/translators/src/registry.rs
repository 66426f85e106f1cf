//! 번역기 레지스트리 — 플랫폼 식별자로 번역기를 찾습니다.
//!
//! 식별자는 소문자로 정규화되어 대소문자를 구분하지 않습니다.
//! 계열 이름(`siem`, `edr`, `nsm`)은 각 계열의 범용 방언을 가리킵니다.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use udfbridge_core::config::{PlatformConfig, UdfBridgeConfig};
use udfbridge_core::translator::Translator;

use crate::error::TranslatorError;
use crate::platform::edr::EdrDialect;
use crate::platform::nsm::{SignatureDialect, ZeekDialect};
use crate::platform::siem::QueryPlatform;
use crate::platform::{Dialect, PlatformTranslator};

/// 기본 등록 플랫폼 식별자
pub const DEFAULT_PLATFORMS: &[&str] = &[
    "siem",
    "splunk",
    "qradar",
    "edr",
    "crowdstrike",
    "sentinelone",
    "microsoft_defender",
    "nsm",
    "snort",
    "suricata",
    "zeek",
];

/// 플랫폼 식별자 → 번역기
#[derive(Clone, Default)]
pub struct TranslatorRegistry {
    translators: HashMap<String, Arc<dyn Translator>>,
}

impl std::fmt::Debug for TranslatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatorRegistry")
            .field("platforms", &self.ids())
            .finish()
    }
}

impl TranslatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 방언을 모두 등록합니다 (플랫폼 설정 없음).
    pub fn with_defaults() -> Result<Self, TranslatorError> {
        Self::build(|_| None)
    }

    /// 기본 방언을 등록하고 `[platforms.<id>]` 설정을 적용합니다.
    ///
    /// 등록되지 않은 플랫폼에 대한 설정은 에러입니다.
    pub fn from_config(config: &UdfBridgeConfig) -> Result<Self, TranslatorError> {
        if let Some(unknown) = config
            .platforms
            .keys()
            .find(|id| !DEFAULT_PLATFORMS.contains(&id.to_ascii_lowercase().as_str()))
        {
            return Err(TranslatorError::Config {
                field: format!("platforms.{unknown}"),
                reason: format!("no translator is registered for '{unknown}'"),
            });
        }
        let registry = Self::build(|id| config.platform(id))?;
        info!(
            platforms = registry.len(),
            configured = config.platforms.len(),
            "translator registry initialized"
        );
        Ok(registry)
    }

    fn build<'a>(
        lookup: impl Fn(&str) -> Option<&'a PlatformConfig>,
    ) -> Result<Self, TranslatorError> {
        let mut registry = Self::new();
        registry.add(QueryPlatform::generic()?, &lookup)?;
        registry.add(QueryPlatform::splunk()?, &lookup)?;
        registry.add(QueryPlatform::qradar()?, &lookup)?;
        registry.add(EdrDialect::generic()?, &lookup)?;
        registry.add(EdrDialect::crowdstrike()?, &lookup)?;
        registry.add(EdrDialect::sentinelone()?, &lookup)?;
        registry.add(EdrDialect::defender()?, &lookup)?;
        registry.add(SignatureDialect::generic()?, &lookup)?;
        registry.add(SignatureDialect::snort()?, &lookup)?;
        registry.add(SignatureDialect::suricata()?, &lookup)?;
        registry.add(ZeekDialect::new()?, &lookup)?;
        Ok(registry)
    }

    fn add<'a, D: Dialect + 'static>(
        &mut self,
        dialect: D,
        lookup: &impl Fn(&str) -> Option<&'a PlatformConfig>,
    ) -> Result<(), TranslatorError> {
        let mut translator = PlatformTranslator::new(dialect);
        if let Some(config) = lookup(translator.platform()) {
            translator.configure(config)?;
        }
        self.register(Arc::new(translator));
        Ok(())
    }

    /// 번역기를 등록합니다. 같은 식별자가 있으면 교체합니다.
    pub fn register(&mut self, translator: Arc<dyn Translator>) {
        self.translators
            .insert(translator.platform().to_ascii_lowercase(), translator);
    }

    /// 식별자로 번역기를 찾습니다.
    pub fn get(&self, platform: &str) -> Result<Arc<dyn Translator>, TranslatorError> {
        self.translators
            .get(&platform.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| TranslatorError::UnknownPlatform(platform.to_owned()))
    }

    pub fn contains(&self, platform: &str) -> bool {
        self.translators
            .contains_key(&platform.trim().to_ascii_lowercase())
    }

    /// 정렬된 플랫폼 식별자 목록
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.translators.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.translators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use udfbridge_core::udf::PlatformFamily;

    #[test]
    fn defaults_cover_every_platform() {
        let registry = TranslatorRegistry::with_defaults().unwrap();
        assert_eq!(registry.len(), DEFAULT_PLATFORMS.len());
        for id in DEFAULT_PLATFORMS {
            assert!(registry.contains(id), "{id} missing");
        }
        assert_eq!(registry.get("edr").unwrap().family(), PlatformFamily::Edr);
        assert_eq!(registry.get("zeek").unwrap().family(), PlatformFamily::Nsm);
    }

    #[test]
    fn lookup_ignores_case() {
        let registry = TranslatorRegistry::with_defaults().unwrap();
        assert_eq!(registry.get("SIEM").unwrap().platform(), "siem");
        assert_eq!(registry.get(" Splunk ").unwrap().platform(), "splunk");
    }

    #[test]
    fn unknown_platform_is_an_error() {
        let registry = TranslatorRegistry::with_defaults().unwrap();
        assert!(matches!(
            registry.get("UNKNOWN"),
            Err(TranslatorError::UnknownPlatform(ref p)) if p == "UNKNOWN"
        ));
    }

    #[test]
    fn config_for_unregistered_platform_is_rejected() {
        let mut config = UdfBridgeConfig::default();
        config
            .platforms
            .insert("arcsight".to_owned(), PlatformConfig::default());
        assert!(matches!(
            TranslatorRegistry::from_config(&config),
            Err(TranslatorError::Config { .. })
        ));
    }

    #[test]
    fn platform_config_is_applied() {
        let mut config = UdfBridgeConfig::default();
        config.platforms.insert(
            "Splunk".to_owned(),
            PlatformConfig {
                validation_rules: BTreeMap::from([(
                    "index_scoped".to_owned(),
                    r"\bindex=".to_owned(),
                )]),
                ..PlatformConfig::default()
            },
        );
        let registry = TranslatorRegistry::from_config(&config).unwrap();
        let metrics = registry
            .get("splunk")
            .unwrap()
            .validate_content(r#"search host="web01""#)
            .unwrap();
        assert!((metrics.accuracy_score - 0.9).abs() < 1e-9);
    }
}
