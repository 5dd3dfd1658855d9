use std::io::Write;

use subcollector::settings::{parse_source_lines, Settings, SettingsError};

#[cfg(test)]
mod settings_tests {
    use super::*;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[common]
sources_file = "lists/sources.list"
local = true
proxy = "http://127.0.0.1:7890"
mirror_raw_github = false
output_dir = "out"

[fetch]
user_agent = "test-agent"
request_timeout = 3
retry_depth = 3

[merge]
max_name_len = 20
"#
        )
        .unwrap();

        let settings = Settings::load_from_file(file.path()).unwrap();
        assert_eq!(settings.common.sources_file, "lists/sources.list");
        assert_eq!(settings.common.output_dir, "out");
        assert_eq!(settings.fetch.user_agent, "test-agent");
        assert_eq!(settings.request_timeout().as_secs(), 3);
        assert_eq!(settings.merge.max_name_len, 20);
        assert!(!settings.local_mode());

        let options = settings.source_options();
        assert_eq!(options.retry_depth, 3);
        assert!(!options.mirror_raw_github);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load_from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_source_list_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.list");
        std::fs::write(
            &path,
            "https://z.example.com/sub\n\n# disabled\n!https://y.example.com/sub\n+date https://x.example.com/%Y%m%d\n",
        )
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let remote = parse_source_lines(&content, false);
        let local = parse_source_lines(&content, true);

        assert_eq!(remote.len(), 3);
        assert_eq!(local.len(), 2);
        assert!(remote[0].is_template());
        assert_eq!(remote[0].tags, vec!["+date".to_string()]);
    }

    #[test]
    fn test_local_mode_follows_proxy() {
        let content = "https://a.example.com/sub\n!https://b.example.com/sub\n";

        let direct = Settings::load_from_content("[common]\nlocal = true\n").unwrap();
        assert!(direct.local_mode());
        assert!(direct.source_options().mirror_raw_github);
        assert_eq!(parse_source_lines(content, direct.local_mode()).len(), 1);

        let proxied = Settings::load_from_content(
            "[common]\nlocal = true\nproxy = \"http://127.0.0.1:7890\"\n",
        )
        .unwrap();
        assert!(!proxied.local_mode());
        assert!(!proxied.source_options().mirror_raw_github);
        assert_eq!(parse_source_lines(content, proxied.local_mode()).len(), 2);

        let ci = Settings::load_from_content("").unwrap();
        assert!(!ci.local_mode());
        assert_eq!(parse_source_lines(content, ci.local_mode()).len(), 2);
    }
}
