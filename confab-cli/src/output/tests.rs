//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::{TextFormatter, format_duration};
    use chrono::{TimeZone, Utc};
    use confab_core::{
        AuthState, AuthToken, ContextStats, ContextSummary, ConversationWindow, Message,
        TokenUsage,
    };
    use confab_store::AuthKeySource;

    #[test]
    fn test_usage_line_estimated() {
        let formatter = TextFormatter::new(false);
        let usage = TokenUsage {
            estimated_prompt: 40,
            estimated_completion: 12,
            ..TokenUsage::default()
        };
        assert_eq!(
            formatter.format_usage_line(&usage),
            "[tokens: prompt ~40, completion ~12, total ~52]"
        );
    }

    #[test]
    fn test_usage_line_reported() {
        let formatter = TextFormatter::new(false);
        let usage = TokenUsage {
            estimated_prompt: 40,
            estimated_completion: 12,
            actual_prompt: Some(44),
            actual_completion: Some(10),
            actual_total: Some(54),
        };
        assert_eq!(
            formatter.format_usage_line(&usage),
            "[tokens: prompt 44, completion 10, total 54]"
        );
    }

    #[test]
    fn test_colors_toggle() {
        let plain = TextFormatter::new(false).error("boom");
        let colored = TextFormatter::new(true).error("boom");
        assert_eq!(plain, "Error: boom");
        assert!(colored.contains("\x1b[31m"));
        assert!(colored.contains("Error: boom"));
    }

    #[test]
    fn test_history_lists_summaries_first() {
        let formatter = TextFormatter::new(false);
        assert_eq!(
            formatter.format_history(&ConversationWindow::new()),
            "(no messages yet)"
        );

        let window = ConversationWindow::from_parts(
            vec![Message::assistant("latest reply")],
            vec![ContextSummary::new("They discussed Rust.", 4, 10)],
        );

        let output = formatter.format_history(&window);
        let summary_at = output.find("[summary of 4 messages]").unwrap();
        let reply_at = output.find("Assistant: latest reply").unwrap();
        assert!(summary_at < reply_at);
    }

    #[test]
    fn test_failed_message_is_marked() {
        let formatter = TextFormatter::new(false);
        let mut message = Message::user("lost");
        message.mark_error();
        let window = ConversationWindow::from_parts(vec![message], Vec::new());

        assert!(formatter.format_history(&window).contains("User (failed): lost"));
    }

    #[test]
    fn test_stats() {
        let formatter = TextFormatter::new(false);
        let stats = ContextStats {
            recent_count: 10,
            summary_block_count: 2,
            total_original_messages: 22,
            estimated_tokens_saved: 3300,
            current_context_tokens: 410,
        };
        let output = formatter.format_stats(&stats);
        assert!(output.contains("Summary blocks:        2"));
        assert!(output.contains("~3300 tokens"));
    }

    #[test]
    fn test_status_authorized_masks_token() {
        let formatter = TextFormatter::new(false);
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let token = AuthToken::new("abcdefghijkl", now.timestamp() + 1800);

        let output = formatter.format_status(
            &AuthState::Authorized(token),
            Some(AuthKeySource::Keychain),
            now,
        );
        assert!(output.contains("abcd****"));
        assert!(!output.contains("abcdefghijkl"));
        assert!(output.contains("30m 00s remaining"));
        assert!(output.contains("system keychain"));
    }

    #[test]
    fn test_status_unauthorized() {
        let output = TextFormatter::new(false).format_status(&AuthState::Unauthorized, None, Utc::now());
        assert!(output.contains("Not logged in"));
        assert!(output.contains("not configured"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(5), "5s");
        assert_eq!(format_duration(250), "4m 10s");
        assert_eq!(format_duration(3900), "1h 05m");
        assert_eq!(format_duration(-3), "0s");
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::{JsonFormatter, StatusOutput};
    use chrono::{TimeZone, Utc};
    use confab_core::{AuthState, AuthToken, Message, SendMessageResult, TokenUsage};

    #[test]
    fn test_reply_output_shape() {
        let mut user_message = Message::user("hi");
        user_message.mark_sent();
        let message = Message::assistant("hello").with_usage(TokenUsage {
            estimated_prompt: 3,
            estimated_completion: 2,
            actual_prompt: Some(7),
            actual_completion: Some(1),
            actual_total: Some(8),
        });
        let result = SendMessageResult {
            user_message,
            message,
            compressed_count: 0,
        };

        let json = JsonFormatter::new(false).format_reply(&result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["reply"], "hello");
        assert_eq!(value["usage"]["promptTokens"], 7);
        assert_eq!(value["usage"]["totalTokens"], 8);
        assert_eq!(value["usage"]["estimated"], false);
        assert_eq!(value["compressedCount"], 0);
    }

    #[test]
    fn test_status_output() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let token = AuthToken::new("abcdefghijkl", now.timestamp() + 60);

        let status = StatusOutput::new(&AuthState::Authorized(token), None, now);
        let value = serde_json::to_value(&status).unwrap();

        assert_eq!(value["state"], "authorized");
        assert_eq!(value["authorized"], true);
        assert_eq!(value["token"], "abcd****");
        assert_eq!(value["secondsRemaining"], 60);
        assert!(value["keySource"].is_null());
    }

    #[test]
    fn test_error_and_pretty() {
        let compact = JsonFormatter::new(false).format_error("nope").unwrap();
        assert_eq!(compact, r#"{"error":"nope"}"#);

        let pretty = JsonFormatter::new(true).format_error("nope").unwrap();
        assert!(pretty.contains('\n'));
    }
}
