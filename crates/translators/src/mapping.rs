//! 필드 이름 매핑 테이블
//!
//! 각 방언은 정규 필드 → 플랫폼 필드의 순서 있는 목록을 가집니다.
//! 역방향 조회는 대소문자를 무시하며, 같은 플랫폼 필드가 여러 번 나오면
//! 목록의 첫 항목이 우선합니다. 렌더링 시에는 모든 필드 매핑을 먼저 적용한 뒤
//! 문법 토큰을 치환합니다.

use crate::rule::fields;

/// 순서 있는 필드 매핑 (정규 → 플랫폼)
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    entries: &'static [(&'static str, &'static str)],
}

impl FieldMap {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    /// 정규 필드에 대응하는 플랫폼 필드
    pub fn to_platform(&self, canonical: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(c, _)| *c == canonical)
            .map(|(_, p)| *p)
    }

    /// 플랫폼 필드에 대응하는 정규 필드
    pub fn to_canonical(&self, platform: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, p)| p.eq_ignore_ascii_case(platform))
            .map(|(c, _)| *c)
    }

    /// 매핑이 있으면 플랫폼 필드, 없으면 원래 이름
    pub fn platform_or_keep(&self, canonical: &str) -> String {
        self.to_platform(canonical)
            .map_or_else(|| canonical.to_owned(), str::to_owned)
    }

    /// 매핑이 있으면 정규 필드, 없으면 원래 이름
    pub fn canonical_or_keep(&self, platform: &str) -> String {
        self.to_canonical(platform)
            .map_or_else(|| platform.to_owned(), str::to_owned)
    }

    pub fn entries(&self) -> &'static [(&'static str, &'static str)] {
        self.entries
    }
}

/// 정규 이름 그대로 사용하는 매핑
pub const IDENTITY: FieldMap = FieldMap::new(&[]);

// ─── SIEM ──────────────────────────────────────────────────────────

pub const SPLUNK: FieldMap = FieldMap::new(&[
    (fields::SOURCE_IP, "src_ip"),
    (fields::DESTINATION_IP, "dest_ip"),
    (fields::SOURCE_PORT, "src_port"),
    (fields::DESTINATION_PORT, "dest_port"),
    (fields::TIMESTAMP, "_time"),
    (fields::PAYLOAD, "_raw"),
    (fields::HTTP_URI, "uri_path"),
    (fields::DNS_QUERY, "query"),
    (fields::PROCESS_NAME, "process_name"),
    (fields::COMMAND_LINE, "process"),
    (fields::PARENT_PROCESS, "parent_process_name"),
    (fields::HOSTNAME, "host"),
    (fields::USER, "user"),
    (fields::FILE_PATH, "file_path"),
    (fields::EVENT_TYPE, "eventtype"),
    (fields::AGENT_ID, "dvc"),
]);

pub const QRADAR: FieldMap = FieldMap::new(&[
    (fields::SOURCE_IP, "sourceip"),
    (fields::DESTINATION_IP, "destinationip"),
    (fields::SOURCE_PORT, "sourceport"),
    (fields::DESTINATION_PORT, "destinationport"),
    (fields::TIMESTAMP, "starttime"),
    (fields::PAYLOAD, "payload"),
    (fields::HTTP_URI, "url"),
    (fields::DNS_QUERY, "dnsdomain"),
    (fields::PROCESS_NAME, "processname"),
    (fields::COMMAND_LINE, "commandline"),
    (fields::PARENT_PROCESS, "parentprocessname"),
    (fields::HOSTNAME, "identityhostname"),
    (fields::USER, "username"),
    (fields::FILE_PATH, "filename"),
    (fields::EVENT_TYPE, "eventname"),
    (fields::AGENT_ID, "logsourceid"),
]);

// ─── EDR ───────────────────────────────────────────────────────────

/// EQL/ECS 필드 (범용 EDR 질의 입력)
pub const ECS: FieldMap = FieldMap::new(&[
    (fields::SOURCE_IP, "source.ip"),
    (fields::DESTINATION_IP, "destination.ip"),
    (fields::SOURCE_PORT, "source.port"),
    (fields::DESTINATION_PORT, "destination.port"),
    (fields::TIMESTAMP, "@timestamp"),
    (fields::HTTP_URI, "url.path"),
    (fields::DNS_QUERY, "dns.question.name"),
    (fields::PROCESS_NAME, "process.name"),
    (fields::COMMAND_LINE, "process.command_line"),
    (fields::PARENT_PROCESS, "process.parent.name"),
    (fields::HOSTNAME, "host.name"),
    (fields::USER, "user.name"),
    (fields::FILE_PATH, "file.path"),
    (fields::EVENT_TYPE, "event.category"),
    (fields::AGENT_ID, "agent.id"),
]);

pub const CROWDSTRIKE: FieldMap = FieldMap::new(&[
    (fields::EVENT_TYPE, "event_simpleName"),
    (fields::HOSTNAME, "ComputerName"),
    (fields::COMMAND_LINE, "CommandLine"),
    (fields::PROCESS_NAME, "ImageFileName"),
    (fields::PARENT_PROCESS, "ParentBaseFileName"),
    (fields::USER, "UserName"),
    (fields::SOURCE_IP, "LocalAddressIP4"),
    (fields::DESTINATION_IP, "RemoteAddressIP4"),
    (fields::SOURCE_PORT, "LocalPort"),
    (fields::DESTINATION_PORT, "RemotePort"),
    (fields::FILE_PATH, "TargetFileName"),
    (fields::DNS_QUERY, "DomainName"),
    (fields::TIMESTAMP, "timestamp"),
    (fields::AGENT_ID, "aid"),
]);

pub const SENTINELONE: FieldMap = FieldMap::new(&[
    (fields::EVENT_TYPE, "eventType"),
    (fields::AGENT_ID, "agentId"),
    (fields::COMMAND_LINE, "processCmd"),
    (fields::PROCESS_NAME, "processName"),
    (fields::PARENT_PROCESS, "parentProcessName"),
    (fields::HOSTNAME, "endpointName"),
    (fields::USER, "user"),
    (fields::SOURCE_IP, "srcIp"),
    (fields::DESTINATION_IP, "dstIp"),
    (fields::SOURCE_PORT, "srcPort"),
    (fields::DESTINATION_PORT, "dstPort"),
    (fields::FILE_PATH, "fileFullName"),
    (fields::DNS_QUERY, "dnsRequest"),
    (fields::HTTP_URI, "url"),
    (fields::TIMESTAMP, "eventTime"),
]);

pub const DEFENDER: FieldMap = FieldMap::new(&[
    (fields::EVENT_TYPE, "ActionType"),
    (fields::HOSTNAME, "DeviceName"),
    (fields::COMMAND_LINE, "ProcessCommandLine"),
    (fields::PROCESS_NAME, "FileName"),
    (fields::PARENT_PROCESS, "InitiatingProcessFileName"),
    (fields::USER, "AccountName"),
    (fields::SOURCE_IP, "LocalIP"),
    (fields::DESTINATION_IP, "RemoteIP"),
    (fields::SOURCE_PORT, "LocalPort"),
    (fields::DESTINATION_PORT, "RemotePort"),
    (fields::FILE_PATH, "FolderPath"),
    (fields::HTTP_URI, "RemoteUrl"),
    (fields::TIMESTAMP, "Timestamp"),
    (fields::AGENT_ID, "DeviceId"),
]);

// ─── NSM ───────────────────────────────────────────────────────────

/// Zeek 스크립트 표현식 (연결 레코드 및 이벤트 인자)
pub const ZEEK: FieldMap = FieldMap::new(&[
    (fields::SOURCE_IP, "c$id$orig_h"),
    (fields::DESTINATION_IP, "c$id$resp_h"),
    (fields::SOURCE_PORT, "c$id$orig_p"),
    (fields::DESTINATION_PORT, "c$id$resp_p"),
    (fields::PAYLOAD, "contents"),
    (fields::HTTP_URI, "unescaped_URI"),
    (fields::DNS_QUERY, "query"),
]);

// ─── EDR 이벤트 범주 ───────────────────────────────────────────────

/// 정규 이벤트 범주 → 벤더 이벤트 이름
#[derive(Debug, Clone, Copy)]
pub struct CategoryMap {
    entries: &'static [(&'static str, &'static str)],
}

impl CategoryMap {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    pub fn to_platform(&self, category: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(category))
            .map(|(_, p)| *p)
    }

    pub fn to_canonical(&self, platform: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, p)| p.eq_ignore_ascii_case(platform))
            .map(|(c, _)| *c)
    }
}

pub const GENERIC_CATEGORIES: CategoryMap = CategoryMap::new(&[
    ("network", "network"),
    ("process", "process"),
    ("file", "file"),
    ("dns", "dns"),
    ("registry", "registry"),
]);

pub const CROWDSTRIKE_CATEGORIES: CategoryMap = CategoryMap::new(&[
    ("network", "NetworkConnectIP4"),
    ("process", "ProcessRollup2"),
    ("file", "NewExecutableWritten"),
    ("dns", "DnsRequest"),
    ("registry", "AsepValueUpdate"),
]);

pub const SENTINELONE_CATEGORIES: CategoryMap = CategoryMap::new(&[
    ("network", "IP Connect"),
    ("process", "Process Creation"),
    ("file", "File Creation"),
    ("dns", "DNS Resolved"),
    ("registry", "Registry Value Modified"),
]);

pub const DEFENDER_CATEGORIES: CategoryMap = CategoryMap::new(&[
    ("network", "ConnectionSuccess"),
    ("process", "ProcessCreated"),
    ("file", "FileCreated"),
    ("dns", "DnsQueryResponse"),
    ("registry", "RegistryValueSet"),
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splunk_and_qradar_map_addresses_differently() {
        assert_eq!(SPLUNK.to_platform(fields::SOURCE_IP), Some("src_ip"));
        assert_eq!(QRADAR.to_platform(fields::SOURCE_IP), Some("sourceip"));
        assert_eq!(SPLUNK.to_platform(fields::TIMESTAMP), Some("_time"));
        assert_eq!(QRADAR.to_platform(fields::TIMESTAMP), Some("starttime"));
    }

    #[test]
    fn reverse_lookup_ignores_case() {
        assert_eq!(QRADAR.to_canonical("SourceIP"), Some(fields::SOURCE_IP));
        assert_eq!(DEFENDER.to_canonical("devicename"), Some(fields::HOSTNAME));
    }

    #[test]
    fn unmapped_fields_are_kept() {
        assert_eq!(SPLUNK.platform_or_keep("sourcetype"), "sourcetype");
        assert_eq!(SPLUNK.canonical_or_keep("index"), "index");
        assert_eq!(IDENTITY.platform_or_keep(fields::PAYLOAD), "payload");
    }

    #[test]
    fn every_table_maps_to_canonical_fields_only() {
        for table in [SPLUNK, QRADAR, ECS, CROWDSTRIKE, SENTINELONE, DEFENDER, ZEEK] {
            for (canonical, _) in table.entries() {
                assert!(fields::is_canonical(canonical), "{canonical} is not canonical");
            }
        }
    }

    #[test]
    fn platform_fields_are_unique_per_table() {
        for table in [SPLUNK, QRADAR, ECS, CROWDSTRIKE, SENTINELONE, DEFENDER, ZEEK] {
            let mut names: Vec<String> = table
                .entries()
                .iter()
                .map(|(_, p)| p.to_ascii_lowercase())
                .collect();
            let total = names.len();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), total);
        }
    }

    #[test]
    fn category_maps_roundtrip() {
        for map in [
            GENERIC_CATEGORIES,
            CROWDSTRIKE_CATEGORIES,
            SENTINELONE_CATEGORIES,
            DEFENDER_CATEGORIES,
        ] {
            let vendor = map.to_platform("process").unwrap();
            assert_eq!(map.to_canonical(vendor), Some("process"));
        }
    }
}
