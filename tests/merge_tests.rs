use subcollector::merge::{is_fake, Merger};
use subcollector::models::RawEntry;
use subcollector::parser::classifier::classify_str;

#[cfg(test)]
mod merge_tests {
    use super::*;

    fn links(items: &[&str]) -> Vec<RawEntry> {
        items.iter().copied().map(RawEntry::from).collect()
    }

    #[test]
    fn test_merging_twice_records_both_sources() {
        let mut merger = Merger::default();
        let entries = links(&["trojan://pw@t.example.com:443#T"]);
        merger.merge_entries(0, &entries);
        let summary = merger.merge_entries(4, &entries);

        assert_eq!(summary.added, 0);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(merger.len(), 1);
        let proxy = merger.proxies().next().unwrap();
        assert_eq!(merger.provenance(&proxy.identity()), &[0, 4]);
    }

    #[test]
    fn test_same_identity_first_wins() {
        let mut merger = Merger::default();
        merger.merge_entries(
            0,
            &links(&[
                "trojan://first@t.example.com:443#First",
                "trojan://second@t.example.com:443#Second",
            ]),
        );
        assert_eq!(merger.len(), 1);
        let proxy = merger.proxies().next().unwrap();
        assert_eq!(proxy.name, "First");
        assert_eq!(proxy.password(), Some("first"));
    }

    #[test]
    fn test_colliding_names_are_numbered() {
        let mut merger = Merger::default();
        merger.merge_entries(
            0,
            &links(&[
                "trojan://pw@a.example.com:443#name",
                "trojan://pw@b.example.com:443#name",
                "trojan://pw@c.example.com:443#name",
            ]),
        );
        let names: Vec<&str> = merger.proxies().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "name #1", "name #2"]);
    }

    #[test]
    fn test_long_names_truncated_before_disambiguation() {
        let long = "x".repeat(40);
        let mut merger = Merger::default();
        merger.merge_entries(
            0,
            &links(&[
                &format!("trojan://pw@a.example.com:443#{}", long),
                &format!("trojan://pw@b.example.com:443#{}y", long),
            ]),
        );
        let names: Vec<String> = merger.proxies().map(|p| p.name.clone()).collect();
        let truncated = format!("{}...", "x".repeat(27));
        assert_eq!(names, vec![truncated.clone(), format!("{} #1", truncated)]);
    }

    #[test]
    fn test_fake_endpoints_excluded_from_views() {
        let mut merger = Merger::default();
        merger.merge_entries(
            0,
            &links(&[
                "trojan://pw@8.8.8.8:443#Fake",
                "trojan://pw@1.2.3.4.example.com:443#Real",
            ]),
        );
        assert_eq!(merger.len(), 2);

        let ray: Vec<&str> = merger.ray_view().map(|p| p.server.as_str()).collect();
        let clash: Vec<&str> = merger.clash_view().map(|p| p.server.as_str()).collect();
        assert_eq!(ray, vec!["1.2.3.4.example.com"]);
        assert_eq!(clash, vec!["1.2.3.4.example.com"]);
        assert!(merger.proxies().any(is_fake));
    }

    #[test]
    fn test_capability_partition() {
        let mut merger = Merger::default();
        let ssr = "ssr://cy5leGFtcGxlLmNvbTo4Mzg4Om9yaWdpbjphZXMtMjU2LWNmYjpwbGFpbjpjR0Z6Y3cvP3JlbWFya3M9VTFOUw";
        merger.merge_entries(0, &links(&[ssr]));
        assert_eq!(merger.len(), 1);
        assert_eq!(merger.clash_view().count(), 1);
        assert_eq!(merger.ray_view().count(), 0);
    }

    #[test]
    fn test_clash_body_through_classifier() {
        let body = r#"
mixed-port: 7890
proxies:
  - {name: a, type: ss, server: s.example.com, port: 8388, cipher: aes-128-gcm, password: 123456}
  - {name: h, type: hysteria2, server: h.example.com, port: 443, password: x}
  - trojan://pw@t.example.com:443#b
proxy-groups:
  - {name: Proxy, type: select, proxies: [a]}
"#;
        let entries = classify_str(body).unwrap();
        assert_eq!(entries.len(), 3);

        let mut merger = Merger::default();
        let summary = merger.merge_entries(0, &entries);
        assert_eq!(summary.added, 2);
        assert_eq!(summary.unknown, 1);
        assert!(matches!(merger.unknown()[0], RawEntry::Fragment(_)));
    }
}
