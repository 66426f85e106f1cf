#![no_main]

use libfuzzer_sys::fuzz_target;
use udfbridge_translators::syntax::signature::SignatureSyntax;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(syntax) = SignatureSyntax::new() else {
        return;
    };

    // 파싱에 성공한 시그니처는 렌더링과 UDF 변환도 패닉 없이 끝나야 함
    if let Ok(signature) = syntax.parse(text) {
        let _ = signature.render();
        let _ = signature.into_body();
    }
});
