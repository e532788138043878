//! Per-line source preprocessing applied before compilation.

use crate::network::NetworkProfile;

/// Console logging is kept only on the local simulation network and a
/// locally running node.
pub fn strips_console_log(network: &NetworkProfile) -> bool {
    !network.is_local()
}

/// Output of [`remove_console_log`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub text: String,
    pub removed: usize,
}

/// Drop every line calling `console.log(` or importing `hardhat/console.sol`.
///
/// Only the code part of a line counts: a call mentioned in a trailing `//`
/// comment keeps the line. A call whose arguments span several lines drops
/// its continuation lines too, until the parentheses balance. The whole line
/// holding the call is dropped, including any other statement on it. Other
/// lines, including their line endings, are kept as they are.
pub fn remove_console_log(source: &str) -> Preprocessed {
    let mut text = String::with_capacity(source.len());
    let mut removed = 0;
    let mut open_parens: i64 = 0;
    for line in source.split_inclusive('\n') {
        let code = code_part(line);
        if open_parens > 0 {
            open_parens += paren_balance(code);
            removed += 1;
        } else if is_console_line(code) {
            open_parens = paren_balance(code).max(0);
            removed += 1;
        } else {
            text.push_str(line);
        }
    }
    Preprocessed { text, removed }
}

/// The line up to a `//` comment
fn code_part(line: &str) -> &str {
    match line.find("//") {
        Some(index) => &line[..index],
        None => line,
    }
}

fn paren_balance(code: &str) -> i64 {
    code.chars().fold(0, |depth, c| match c {
        '(' => depth + 1,
        ')' => depth - 1,
        _ => depth,
    })
}

fn is_console_line(code: &str) -> bool {
    let trimmed = code.trim_start();
    if trimmed.starts_with("import") && trimmed.contains("hardhat/console.sol") {
        return true;
    }
    trimmed.contains("console.log(")
}
