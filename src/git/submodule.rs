//! `.gitmodules` parsing.

use crate::models::Submodule;

/// Parses `[submodule "name"]` sections into path/url records, in file
/// order. Sections missing either key are dropped.
pub fn parse_config(text: &str) -> Vec<Submodule> {
    let mut submodules = Vec::new();
    let mut current: Option<(Option<String>, Option<String>)> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') {
            flush(&mut submodules, current.take());
            if is_submodule_section(line) {
                current = Some((None, None));
            }
            continue;
        }

        let Some((path, url)) = current.as_mut() else {
            continue;
        };
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "path" => *path = Some(value),
                "url" => *url = Some(value),
                _ => {}
            }
        }
    }

    flush(&mut submodules, current);
    submodules
}

fn is_submodule_section(line: &str) -> bool {
    line.trim_start_matches('[')
        .trim_start()
        .get(..9)
        .is_some_and(|s| s.eq_ignore_ascii_case("submodule"))
}

fn flush(out: &mut Vec<Submodule>, section: Option<(Option<String>, Option<String>)>) {
    if let Some((Some(path), Some(url))) = section {
        out.push(Submodule { path, url });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_submodule() {
        let config = "[submodule \"ui\"]\n\tpath = vendor/ui\n\turl = git://gitorious.org/gitorious/ui3.git\n";

        assert_eq!(
            parse_config(config),
            vec![Submodule {
                path: "vendor/ui".to_string(),
                url: "git://gitorious.org/gitorious/ui3.git".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_preserves_order_and_skips_noise() {
        let config = r#"
# vendored
[submodule "b"]
    URL = https://github.com/cjohansen/b.git
    path = lib/b
[core]
    path = not/a/submodule
    url = nope
; another comment
[submodule "a"]
    path=lib/a
    url=git@github.com:cjohansen/a.git
[submodule "incomplete"]
    path = lib/c
"#;

        let paths: Vec<_> = parse_config(config).into_iter().map(|s| s.path).collect();
        assert_eq!(paths, vec!["lib/b", "lib/a"]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_config("").is_empty());
    }
}
