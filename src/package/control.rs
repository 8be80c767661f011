//! Reading and writing deb822 control paragraphs.
//!
//! Only what control templates need is supported: `Field: value` lines,
//! continuation lines starting with whitespace, blank lines between
//! paragraphs and `#` comments.

use super::{FieldValue, Package};
use crate::error::{Error, Result};

/// Parse every paragraph of `text`. `name` is used in error messages.
pub fn parse(name: &str, text: &str) -> Result<Vec<Package>> {
    let mut packages = Vec::new();
    let mut fields: Vec<(String, String)> = Vec::new();

    let finish = |fields: &mut Vec<(String, String)>, packages: &mut Vec<Package>| {
        if fields.is_empty() {
            return;
        }
        let mut package = Package::new();
        for (field, value) in fields.drain(..) {
            package.set(&field, &value);
        }
        packages.push(package);
    };

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            finish(&mut fields, &mut packages);
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        if line.starts_with([' ', '\t']) {
            let (_, value) = fields.last_mut().ok_or_else(|| Error::ControlParse {
                name: name.to_string(),
                message: format!("line {}: continuation line without a field", index + 1),
            })?;
            value.push('\n');
            value.push_str(line[1..].trim_end());
            continue;
        }

        let (field, value) = line.split_once(':').ok_or_else(|| Error::ControlParse {
            name: name.to_string(),
            message: format!("line {}: expected 'Field: value'", index + 1),
        })?;
        let field = field.trim();
        if field.is_empty() {
            return Err(Error::ControlParse {
                name: name.to_string(),
                message: format!("line {}: empty field name", index + 1),
            });
        }
        fields.push((field.to_string(), value.trim().to_string()));
    }
    finish(&mut fields, &mut packages);

    Ok(packages)
}

/// Render stanzas separated by blank lines. Empty fields are left out.
pub fn render<'a>(packages: impl IntoIterator<Item = &'a Package>) -> String {
    let mut out = String::new();
    for package in packages {
        for (field, value) in package.iter() {
            if value.is_empty() {
                continue;
            }
            out.push_str(field);
            out.push_str(": ");
            match value {
                // folded text keeps its continuation lines indented
                FieldValue::Text(text) => out.push_str(&text.replace('\n', "\n ")),
                other => out.push_str(&other.to_string()),
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
