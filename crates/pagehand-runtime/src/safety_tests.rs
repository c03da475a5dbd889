use super::*;

fn gate() -> SafetyGate {
    SafetyGate::new()
}

fn blocked_reason(verdict: SafetyVerdict) -> String {
    match verdict {
        SafetyVerdict::Blocked { blocked_reason, .. } => blocked_reason,
        other => panic!("expected block, got {:?}", other),
    }
}

#[test]
fn test_fetch_anywhere_is_blocked() {
    let verdict = gate().check("let x = 1; fetch('/api/steal')", &ActionKind::Click);
    assert!(!verdict.is_safe());
    assert_eq!(blocked_reason(verdict), "Network requests are not allowed");

    let verdict = gate().check("window.fetch (url)", &ActionKind::Other("script".to_string()));
    assert_eq!(blocked_reason(verdict), "Network requests are not allowed");

    for payload in ["_fetch('/x')", "myfetch(url)", "const r = xfetch("] {
        let verdict = gate().check(payload, &ActionKind::Other("script".to_string()));
        assert_eq!(blocked_reason(verdict), "Network requests are not allowed", "{}", payload);
    }
}

#[test]
fn test_prefixed_dynamic_code_is_blocked() {
    let cases = [
        ("window._eval(code)", "Dynamic code execution is not allowed"),
        ("indirecteval (code)", "Dynamic code execution is not allowed"),
        ("new _Function('return 1')", "Dynamic code execution is not allowed"),
        ("$import('https://x')", "Dynamic imports are not allowed"),
        ("await reimport('./m.js')", "Dynamic imports are not allowed"),
    ];
    for (payload, reason) in cases {
        let verdict = gate().check(payload, &ActionKind::Other("script".to_string()));
        assert_eq!(blocked_reason(verdict), reason, "{}", payload);
    }

    let cleaned = SafetyGate::sanitize("_fetch('/x'); x_eval(y)");
    assert!(!cleaned.contains("fetch("));
    assert!(!cleaned.contains("eval("));
}

#[test]
fn test_first_block_rule_wins() {
    let verdict = gate().check("document.cookie; fetch(x)", &ActionKind::Click);
    match verdict {
        SafetyVerdict::Blocked { blocked_fragment, blocked_reason } => {
            assert_eq!(blocked_reason, "Network requests are not allowed");
            assert_eq!(blocked_fragment, "fetch(");
        }
        other => panic!("expected block, got {:?}", other),
    }
}

#[test]
fn test_block_categories() {
    let cases = [
        ("new XMLHttpRequest()", "Network requests are not allowed"),
        ("navigator.sendBeacon(u)", "Network connections are not allowed"),
        ("document.cookie", "Cookie access is not allowed"),
        ("localStorage.getItem('t')", "Storage access is not allowed"),
        ("eval(code)", "Dynamic code execution is not allowed"),
        ("new Function('return 1')", "Dynamic code execution is not allowed"),
        ("setTimeout('alert(1)', 10)", "Dynamic code execution is not allowed"),
        ("<script src=x>", "Script injection is not allowed"),
        ("javascript:alert(1)", "JavaScript URLs are not allowed"),
        ("chrome.tabs.query({})", "Extension API access is not allowed"),
        ("import('https://x')", "Dynamic imports are not allowed"),
        ("document.write('x')", "Writing to the document is not allowed"),
    ];
    for (payload, reason) in cases {
        let verdict = gate().check(payload, &ActionKind::Other("script".to_string()));
        assert_eq!(blocked_reason(verdict), reason, "payload: {}", payload);
    }
}

#[test]
fn test_non_web_navigation_blocked() {
    let verdict = gate().check("file:///etc/passwd", &ActionKind::Navigate);
    assert!(!verdict.is_safe());
    assert!(gate().check("https://example.com", &ActionKind::Navigate).is_safe());
}

#[test]
fn test_plain_actions_are_safe() {
    assert_eq!(gate().check("el_3", &ActionKind::Click), SafetyVerdict::Safe);
    assert_eq!(gate().check("down:400", &ActionKind::Scroll), SafetyVerdict::Safe);
    assert_eq!(gate().check("largerText", &ActionKind::Modify), SafetyVerdict::Safe);
}

#[test]
fn test_flags_accumulate() {
    let verdict = gate().check("click Place order and submit", &ActionKind::Click);
    match verdict {
        SafetyVerdict::Flagged { confirmation_message, flags } => {
            assert_eq!(flags, vec!["payment or purchase", "form submission"]);
            assert!(confirmation_message.contains("payment or purchase and form submission"));
        }
        other => panic!("expected flags, got {:?}", other),
    }
}

#[test]
fn test_block_beats_flags() {
    let verdict = gate().check("delete account; fetch('/x')", &ActionKind::Click);
    assert!(!verdict.is_safe());
}

#[test]
fn test_check_action_flags_description() {
    let action = GeneratedAction::new(ActionKind::Click)
        .with_target("el_4")
        .with_description("Delete the selected email");
    assert!(gate().check_action(&action).needs_confirmation());
}

#[test]
fn test_check_action_blocks_target() {
    let action = GeneratedAction::new(ActionKind::Click).with_target("a[href^='javascript:']");
    assert!(!gate().check_action(&action).is_safe());
}

#[test]
fn test_validate_selectors() {
    let known: HashSet<String> = ["el_0", "el_1"].iter().map(|s| s.to_string()).collect();

    let ok = SafetyGate::validate_selectors("el_1\nhello", &known);
    assert!(ok.valid);

    let stale = SafetyGate::validate_selectors("el_1 then el_7 and el_7, el_12", &known);
    assert!(!stale.valid);
    assert_eq!(stale.invalid_selectors, vec!["el_7", "el_12"]);

    assert!(SafetyGate::validate_selectors("#login-button", &known).valid);
}

#[test]
fn test_sanitize_strips_dangerous_fragments() {
    let cleaned = SafetyGate::sanitize("document.title; fetch('/x'); eval(y)");
    assert!(!cleaned.contains("fetch("));
    assert!(!cleaned.contains("eval("));
    assert!(cleaned.contains("document.title"));
}
