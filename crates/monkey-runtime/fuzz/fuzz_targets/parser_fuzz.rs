//! Lexer and parser stability fuzzer
//!
//! Any UTF-8 input must come back as a program plus diagnostics, never a
//! panic, and parsing the same input twice must agree.

#![no_main]

use libfuzzer_sys::fuzz_target;

use monkey_runtime::lexer::Lexer;
use monkey_runtime::parser::Parser;

fuzz_target!(|data: &[u8]| {
    let input = match std::str::from_utf8(data) {
        Ok(s) => s,
        Err(_) => return,
    };

    let (first_count, first_diags) = parse(input);
    let (second_count, second_diags) = parse(input);
    assert_eq!(first_count, second_count, "statement count differs between runs");
    assert_eq!(first_diags, second_diags, "diagnostic count differs between runs");

    // Truncated programs exercise recovery paths
    if input.len() > 4 {
        for split in [input.len() / 4, input.len() / 2, 3 * input.len() / 4] {
            if let Some(prefix) = input.get(..split) {
                let _ = parse(prefix);
            }
        }
    }
});

fn parse(input: &str) -> (usize, usize) {
    let (tokens, lex_diags) = Lexer::new(input).tokenize();
    let (program, parse_diags) = Parser::new(tokens).parse();
    (program.statements.len(), lex_diags.len() + parse_diags.len())
}
