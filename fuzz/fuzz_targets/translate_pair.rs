#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use udfbridge_core::ConversionOptions;
use udfbridge_translators::TranslatorRegistry;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    source: u8,
    target: u8,
    optimization_level: u8,
    content: String,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(registry) = TranslatorRegistry::with_defaults() else {
        return;
    };
    let ids = registry.ids();
    let pick = |n: u8| ids[usize::from(n) % ids.len()].clone();

    let (Ok(source), Ok(target)) = (
        registry.get(&pick(input.source)),
        registry.get(&pick(input.target)),
    ) else {
        return;
    };

    // 해석 → 렌더링 → 재검증 경로 전체가 에러로만 실패해야 함
    let Ok(udf) = source.to_udf(&input.content) else {
        return;
    };
    let options = ConversionOptions {
        optimization_level: input.optimization_level % 4,
        ..ConversionOptions::default()
    };
    if let Ok(rendition) = target.from_udf(&udf, &options) {
        let _ = target.validate_content(&rendition.content);
    }
});
