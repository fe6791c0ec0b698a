//! `git blame --porcelain` parsing.
//!
//! Porcelain output is a sequence of hunks. Each hunk starts with a header
//! `<oid> <orig-line> <final-line> [<count>]`; the first time an oid shows
//! up the header is followed by a metadata block (`author`, `author-mail`,
//! ... `filename`). Every header is followed by one source line, prefixed
//! with a tab. Later hunks of an already-seen commit omit the metadata, so
//! it is cached per oid and copied into every chunk of that commit.

use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::git::is_object_id;
use crate::git::paths::normalize_path;
use crate::git::repository::{check_revision, GitRepository};
use crate::models::{Blame, BlameChunk, Signature};

impl GitRepository {
    /// Per-line attribution of `ref:path`. Source lines come back byte for
    /// byte, carriage returns included; bytes that are not UTF-8 are
    /// replaced with U+FFFD.
    pub async fn blame(&self, git_ref: &str, path: &str) -> Result<Blame> {
        check_revision(git_ref)?;
        let path = normalize_path(path);
        let spec = format!("{}:{}", git_ref, path);

        let output = self
            .git(["blame", "-l", "-t", "-p", git_ref, "--", path.as_str()], &spec)
            .await?;

        parse_porcelain(&output.stdout_text())
    }
}

#[derive(Debug, Clone)]
struct CommitMeta {
    author: Signature,
    committer: Signature,
    summary: String,
}

pub fn parse_porcelain(output: &str) -> Result<Blame> {
    let mut commits: HashMap<String, CommitMeta> = HashMap::new();
    let mut chunks: Vec<BlameChunk> = Vec::new();
    // Split on `\n` alone so a CRLF file keeps its `\r`.
    let mut lines = output.strip_suffix('\n').unwrap_or(output).split('\n');

    while let Some(line) = lines.next() {
        if line.is_empty() {
            continue;
        }

        let oid = parse_header(line).ok_or_else(|| {
            AppError::InvalidBlameFormat(format!("expected hunk header, got {:?}", line))
        })?;

        let mut fields: Vec<(&str, &str)> = Vec::new();
        let source = loop {
            match lines.next() {
                Some(l) if is_source_line(l) => break strip_source_prefix(l),
                Some(l) => fields.push(l.split_once(' ').unwrap_or((l, ""))),
                None => {
                    return Err(AppError::InvalidBlameFormat(format!(
                        "missing source line for {}",
                        oid
                    )));
                }
            }
        };

        if !commits.contains_key(oid) {
            commits.insert(oid.to_string(), CommitMeta::from_fields(oid, &fields)?);
        }

        match chunks.last_mut() {
            Some(chunk) if chunk.oid == oid => chunk.lines.push(source.to_string()),
            _ => {
                let meta = &commits[oid];
                chunks.push(BlameChunk {
                    oid: oid.to_string(),
                    author: meta.author.clone(),
                    committer: meta.committer.clone(),
                    summary: meta.summary.clone(),
                    lines: vec![source.to_string()],
                });
            }
        }
    }

    Ok(Blame { chunks })
}

/// Returns the oid of a hunk header line.
fn parse_header(line: &str) -> Option<&str> {
    let mut parts = line.split(' ');
    let oid = parts.next().filter(|p| is_object_id(p))?;
    let numbers: Vec<&str> = parts.collect();

    let valid = matches!(numbers.len(), 2 | 3)
        && numbers.iter().all(|n| n.parse::<u32>().is_ok());
    valid.then_some(oid)
}

fn is_source_line(line: &str) -> bool {
    line.is_empty() || line.starts_with('\t') || line.starts_with(' ')
}

fn strip_source_prefix(line: &str) -> &str {
    line.strip_prefix('\t')
        .or_else(|| line.strip_prefix(' '))
        .unwrap_or(line)
}

impl CommitMeta {
    fn from_fields(oid: &str, fields: &[(&str, &str)]) -> Result<Self> {
        let field = |key: &str| {
            fields
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| *v)
                .ok_or_else(|| {
                    AppError::InvalidBlameFormat(format!("{} is missing {}", oid, key))
                })
        };

        let signature = |role: &str| -> Result<Signature> {
            let time = field(&format!("{}-time", role))?;
            let tz = field(&format!("{}-tz", role))?;
            Ok(Signature {
                name: field(role)?.to_string(),
                mail: strip_brackets(field(&format!("{}-mail", role))?).to_string(),
                time: parse_time(time, tz).ok_or_else(|| {
                    AppError::InvalidBlameFormat(format!("bad {} time {} {}", role, time, tz))
                })?,
            })
        };

        Ok(Self {
            author: signature("author")?,
            committer: signature("committer")?,
            summary: field("summary").unwrap_or_default().to_string(),
        })
    }
}

fn strip_brackets(mail: &str) -> &str {
    mail.strip_prefix('<')
        .and_then(|m| m.strip_suffix('>'))
        .unwrap_or(mail)
}

/// Epoch seconds plus a `+HHMM` / `-HHMM` offset.
fn parse_time(epoch: &str, tz: &str) -> Option<DateTime<FixedOffset>> {
    let seconds: i64 = epoch.parse().ok()?;
    if tz.len() != 5 || !tz.is_char_boundary(1) {
        return None;
    }

    let sign = match &tz[..1] {
        "+" => 1,
        "-" => -1,
        _ => return None,
    };
    let hours: i32 = tz[1..3].parse().ok()?;
    let minutes: i32 = tz[3..5].parse().ok()?;
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;

    Some(DateTime::from_timestamp(seconds, 0)?.with_timezone(&offset))
}
