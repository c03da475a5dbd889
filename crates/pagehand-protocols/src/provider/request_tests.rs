use super::*;

#[test]
fn test_completion_request_new() {
    let request = CompletionRequest::new("gpt-4o", "You are helpful", "Hello");
    assert_eq!(request.model, "gpt-4o");
    assert_eq!(request.system, "You are helpful");
    assert_eq!(request.user_message, "Hello");
    assert_eq!(request.max_tokens, 1000);
    assert!((request.temperature - 0.7).abs() < 0.001);
}

#[test]
fn test_completion_request_builder_chain() {
    let request = CompletionRequest::new("claude-sonnet-4-20250514", "sys", "msg")
        .with_max_tokens(2000)
        .with_temperature(0.2);

    assert_eq!(request.max_tokens, 2000);
    assert!((request.temperature - 0.2).abs() < 0.001);
}

#[test]
fn test_completion_request_serialization() {
    let request = CompletionRequest::new("gpt-4o", "sys", "Test");
    let json = serde_json::to_string(&request).unwrap();
    assert!(json.contains("gpt-4o"));
    assert!(json.contains("user_message"));
}
