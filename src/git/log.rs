//! Parsing of `git log` output in the NUL-separated format below.

use chrono::DateTime;

use crate::error::{AppError, Result};
use crate::git::is_object_id;
use crate::models::{AuthorInfo, Commit};

/// oid, author name, author email, strict ISO 8601 author date, subject.
pub const LOG_FORMAT: &str = "%H%x00%an%x00%ae%x00%aI%x00%s";

/// One commit per line. Blank lines are skipped; anything else that does
/// not parse fails the whole log.
pub fn parse_log(output: &str) -> Result<Vec<Commit>> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Result<Commit> {
    let fields: Vec<&str> = line.splitn(5, '\0').collect();
    let &[oid, name, email, date, summary] = fields.as_slice() else {
        return Err(AppError::MalformedLog(format!(
            "expected 5 fields, got {}: {:?}",
            fields.len(),
            line
        )));
    };

    if !is_object_id(oid) {
        return Err(AppError::MalformedLog(format!("bad commit id {:?}", oid)));
    }

    let date = DateTime::parse_from_rfc3339(date)
        .map_err(|e| AppError::MalformedLog(format!("bad date {:?}: {}", date, e)))?;

    Ok(Commit {
        oid: oid.to_string(),
        author: AuthorInfo {
            name: name.to_string(),
            email: email.to_string(),
        },
        summary: summary.to_string(),
        date,
        message: String::new(),
    })
}
