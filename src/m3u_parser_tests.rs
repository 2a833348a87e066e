//! Tests for M3U playlist parsing and generation

#[cfg(test)]
mod tests {
    use crate::m3u_parser::*;
    use crate::models::{Channel, Playlist};

    #[test]
    fn test_parse_m3u() {
        let content = r#"
#EXTM3U
#EXTINF:-1 tvg-id="cnn" group-title="News" tvg-logo="http://example.com/cnn.png",CNN
http://example.com/live/user/pass/1.ts
#EXTINF:-1 tvg-id="bbc" group-title="News",BBC
http://example.com/live/user/pass/2.ts
"#;
        let channels = parse_m3u(content);
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].name, "CNN");
        assert_eq!(channels[0].category, "News");
        assert_eq!(channels[0].logo, "http://example.com/cnn.png");
        assert_eq!(channels[0].url, "http://example.com/live/user/pass/1.ts");
        assert_eq!(channels[1].name, "BBC");
        assert_eq!(channels[1].logo, "");
    }

    #[test]
    fn test_extinf_without_url_is_dropped() {
        let content = "#EXTINF:-1,A\n#EXTINF:-1,B\nhttp://b\n";
        let channels = parse_m3u(content);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "B");
        assert_eq!(channels[0].url, "http://b");
    }

    #[test]
    fn test_missing_attributes_use_defaults() {
        let channels = parse_m3u("#EXTM3U\n#EXTINF:-1,Plain\nhttp://example.com/plain.ts\n");
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].category, "General");
        assert_eq!(channels[0].logo, "");
    }

    #[test]
    fn test_missing_comma_uses_placeholder_name() {
        let channels = parse_m3u("#EXTINF:-1 group-title=\"Sports\"\nhttp://example.com/s.ts\n");
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "Unknown Channel");
        assert_eq!(channels[0].category, "Sports");
    }

    #[test]
    fn test_url_without_extinf_is_ignored() {
        assert!(parse_m3u("http://x").is_empty());
        assert!(parse_m3u("#EXTM3U\nhttp://x\nhttp://y\n").is_empty());
    }

    #[test]
    fn test_name_after_last_comma() {
        let channels = parse_m3u("#EXTINF:-1 tvg-name=\"a\",Movies, Action,  HD One \nhttp://m\n");
        assert_eq!(channels[0].name, "HD One");
    }

    #[test]
    fn test_url_line_is_trimmed() {
        let channels = parse_m3u("#EXTINF:-1,Padded\n   https://example.com/p.m3u8   \n");
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].url, "https://example.com/p.m3u8");
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let content = r#"#EXTM3U x-tvg-url="http://example.com/epg.xml"

#EXTINF:-1 group-title="Kids",Cartoons
#EXTVLCOPT:http-user-agent=Mozilla
# just a comment

http://example.com/cartoons.ts
"#;
        let channels = parse_m3u(content);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "Cartoons");
        assert_eq!(channels[0].category, "Kids");
    }

    #[test]
    fn test_non_http_stream_lines_ignored() {
        let content = "#EXTINF:-1,Multicast\nudp://@233.50.230.1:5000\n#EXTINF:-1,Web\nhttp://w\n";
        let channels = parse_m3u(content);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "Web");
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        let content = "#EXTINF:-1,Same\nhttp://same\n#EXTINF:-1,Other\nhttp://other\n#EXTINF:-1,Same\nhttp://same\n";
        let names: Vec<_> = parse_m3u(content).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Same", "Other", "Same"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let channels = parse_m3u("#EXTM3U\r\n#EXTINF:-1 group-title=\"News\",CNN\r\nhttp://cnn\r\n");
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "CNN");
        assert_eq!(channels[0].url, "http://cnn");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_m3u("").is_empty());
        assert!(parse_m3u("#EXTM3U\n").is_empty());
    }

    #[test]
    fn test_generate_m3u_format() {
        let channels = vec![Channel::new("CNN", "http://example.com/cnn.m3u8")
            .with_category("News")
            .with_logo("http://example.com/cnn.png")];
        let text = generate_m3u(&channels);
        assert_eq!(
            text,
            "#EXTM3U\n#EXTINF:-1 group-title=\"News\" tvg-logo=\"http://example.com/cnn.png\",CNN\nhttp://example.com/cnn.m3u8\n"
        );
    }

    #[test]
    fn test_generate_empty() {
        assert_eq!(generate_m3u(&[]), "#EXTM3U\n");
    }

    #[test]
    fn test_round_trip() {
        let channels = vec![
            Channel::new("CNN", "http://example.com/cnn.m3u8").with_category("News"),
            Channel::new("Cartoon Net", "https://example.com/cn.ts")
                .with_category("Kids")
                .with_logo("https://example.com/cn.png"),
            Channel::new("Local Radio", "http://radio.local:8000/stream"),
        ];

        let parsed = parse_m3u(&generate_m3u(&channels));
        assert_eq!(parsed.len(), channels.len());
        for (expected, reparsed) in channels.iter().zip(&parsed) {
            assert_eq!(expected.name, reparsed.name);
            assert_eq!(expected.url, reparsed.url);
            assert_eq!(expected.category, reparsed.category);
            assert_eq!(expected.logo, reparsed.logo);
        }
    }

    #[test]
    fn test_round_trip_comma_in_name_is_lossy() {
        // Names are not escaped; the last comma wins on the way back in
        let channels = vec![Channel::new("News, Weather", "http://nw")];
        let parsed = parse_m3u(&generate_m3u(&channels));
        assert_eq!(parsed[0].name, "Weather");
    }

    #[test]
    fn test_load_local_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.m3u");
        std::fs::write(&path, "#EXTM3U\n#EXTINF:-1 group-title=\"News\",CNN\nhttp://cnn\n").unwrap();

        let playlist = Playlist::from_source(path.to_str().unwrap());
        assert!(playlist.is_local);

        let channels = load_playlist(&playlist, "test-agent").unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].category, "News");
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let playlist = Playlist::from_source("/definitely/not/here.m3u");
        assert!(load_playlist(&playlist, "test-agent").is_err());
    }
}
