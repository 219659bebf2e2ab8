//! Common named patterns.
//!
//! Fields constrained by one of these patterns report `match` violations
//! under the pattern's name (`email`, `url`, ...) instead of the raw regex
//! source, which lets the validation engine pick a friendlier message.

use once_cell::sync::Lazy;
use regex::Regex;

fn compile(source: &str) -> Regex {
    match Regex::new(source) {
        Ok(re) => re,
        Err(e) => panic!("built-in pattern {source:?} failed to compile: {e}"),
    }
}

pub static EMAIL: Lazy<Regex> = Lazy::new(|| {
    compile(
        r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
    )
});

pub static TELEPHONE: Lazy<Regex> = Lazy::new(|| {
    compile(r"^(\+?\d{1,3}(\s+|-)?)?(\(\d{3}\)|\d{3})(\s+|-|\.)?\d{3}(\s+|-|\.)?\d{4}$")
});

pub static URL: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"^((https?|ftp)://)?(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)$",
    )
});

pub static SIMPLE_NAME: Lazy<Regex> =
    Lazy::new(|| compile(r"^([a-zA-Z\x{0080}-\x{FFFF}]{0,100}){0,3}$"));

pub static POSTAL_CODE: Lazy<Regex> = Lazy::new(|| compile(r"^\d{5}(?:[-\s]\d{4})?$"));

/// All built-in patterns with their names.
pub fn common() -> [(&'static str, &'static Regex); 5] {
    [
        ("email", &*EMAIL),
        ("telephone", &*TELEPHONE),
        ("url", &*URL),
        ("simple_name", &*SIMPLE_NAME),
        ("postal_code", &*POSTAL_CODE),
    ]
}
