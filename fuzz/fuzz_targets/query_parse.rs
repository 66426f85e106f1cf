#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use udfbridge_translators::syntax::query::{self, QRADAR, QuerySyntax, SPLUNK};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    qradar: bool,
    text: String,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(syntax) = QuerySyntax::new() else {
        return;
    };
    let dialect = if input.qradar { &QRADAR } else { &SPLUNK };

    if let Ok(body) = syntax.parse(&input.text, dialect) {
        let _ = query::render(dialect, &body);
    }
});
