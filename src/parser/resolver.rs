//! Implicit tag resolution for plain scalars (YAML 1.1 core schema).
//!
//! Timestamps and sexagesimal numbers are left as strings.

pub const NULL: &str = "tag:yaml.org,2002:null";
pub const BOOL: &str = "tag:yaml.org,2002:bool";
pub const INT: &str = "tag:yaml.org,2002:int";
pub const FLOAT: &str = "tag:yaml.org,2002:float";
pub const STR: &str = "tag:yaml.org,2002:str";
pub const SEQ: &str = "tag:yaml.org,2002:seq";
pub const MAP: &str = "tag:yaml.org,2002:map";
pub const MERGE: &str = "tag:yaml.org,2002:merge";

const BOOL_WORDS: &[&str] = &[
    "yes", "Yes", "YES", "no", "No", "NO", "true", "True", "TRUE", "false", "False", "FALSE",
    "on", "On", "ON", "off", "Off", "OFF",
];

const NULL_WORDS: &[&str] = &["", "~", "null", "Null", "NULL"];

/// Pick the tag of a scalar whose tag was not given explicitly.
pub fn resolve_scalar(value: &str, plain_implicit: bool) -> String {
    if plain_implicit {
        let tag = if NULL_WORDS.contains(&value) {
            NULL
        } else if BOOL_WORDS.contains(&value) {
            BOOL
        } else if value == "<<" {
            MERGE
        } else if is_float(value) {
            FLOAT
        } else if is_int(value) {
            INT
        } else {
            STR
        };
        return tag.to_string();
    }
    STR.to_string()
}

fn strip_sign(value: &str) -> &str {
    value
        .strip_prefix('-')
        .or_else(|| value.strip_prefix('+'))
        .unwrap_or(value)
}

fn all_in(s: &str, pred: impl Fn(char) -> bool) -> bool {
    !s.is_empty() && s.chars().all(pred)
}

pub(crate) fn is_int(value: &str) -> bool {
    let digits = strip_sign(value);
    if let Some(bin) = digits.strip_prefix("0b") {
        return all_in(bin, |c| c == '0' || c == '1' || c == '_');
    }
    if let Some(hex) = digits.strip_prefix("0x") {
        return all_in(hex, |c| c.is_ascii_hexdigit() || c == '_');
    }
    if digits == "0" {
        return true;
    }
    if let Some(oct) = digits.strip_prefix('0') {
        return all_in(oct, |c| ('0'..='7').contains(&c) || c == '_');
    }
    match digits.chars().next() {
        Some(first) if ('1'..='9').contains(&first) => {
            digits.chars().all(|c| c.is_ascii_digit() || c == '_')
        }
        _ => false,
    }
}

pub(crate) fn is_float(value: &str) -> bool {
    let unsigned = strip_sign(value);
    if matches!(unsigned, ".inf" | ".Inf" | ".INF") {
        return true;
    }
    if matches!(value, ".nan" | ".NaN" | ".NAN") {
        return true;
    }

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(pos) => (&unsigned[..pos], Some(&unsigned[pos + 1..])),
        None => (unsigned, None),
    };
    if let Some(exponent) = exponent {
        // The exponent sign is mandatory in YAML 1.1.
        let Some(digits) = exponent
            .strip_prefix('-')
            .or_else(|| exponent.strip_prefix('+'))
        else {
            return false;
        };
        if !all_in(digits, |c| c.is_ascii_digit()) {
            return false;
        }
    }

    let Some((whole, fraction)) = mantissa.split_once('.') else {
        return false;
    };
    if whole.is_empty() {
        // `.5` style: no sign allowed, at least one leading digit.
        return value == unsigned
            && fraction.starts_with(|c: char| c.is_ascii_digit())
            && fraction.chars().all(|c| c.is_ascii_digit() || c == '_');
    }
    whole.starts_with(|c: char| c.is_ascii_digit())
        && whole.chars().all(|c| c.is_ascii_digit() || c == '_')
        && fraction.chars().all(|c| c.is_ascii_digit() || c == '_')
}
