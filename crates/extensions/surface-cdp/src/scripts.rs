//! JavaScript evaluated in the page through `Runtime.evaluate`.
//!
//! Elements are stamped with a numeric `data-pagehand-handle` attribute the
//! first time they are reported, so a handle keeps pointing at the same DOM
//! node until that node is removed.

use pagehand_protocols::ElementHandle;
use serde_json::Value;

pub(crate) const HANDLE_ATTRIBUTE: &str = "data-pagehand-handle";

/// Shared prelude: `stamp(el)` assigns or reads an element's handle.
/// Expects `ATTR` to be bound first.
const PRELUDE: &str = r#"
const stamp = (el) => {
  let h = el.getAttribute(ATTR);
  if (!h) {
    window.__pagehandNext = (window.__pagehandNext || 0) + 1;
    h = String(window.__pagehandNext);
    el.setAttribute(ATTR, h);
  }
  return Number(h);
};
const byHandle = (h) => document.querySelector('[' + ATTR + '="' + h + '"]');
"#;

const PAGE_INFO: &str = r#"({
  url: location.href,
  title: document.title,
  readyState: document.readyState,
  viewport: { width: window.innerWidth, height: window.innerHeight }
})"#;

const ELEMENTS_BODY: &str = r#"
const CANDIDATES = 'a, button, input, select, textarea, summary, label, [role], [onclick], [tabindex], [contenteditable="true"]';
const INTERACTIVE_TAGS = new Set(['a', 'button', 'input', 'select', 'textarea', 'summary']);
const INTERACTIVE_ROLES = new Set(['button', 'link', 'checkbox', 'radio', 'tab', 'menuitem', 'option', 'switch', 'textbox', 'combobox', 'searchbox', 'slider']);
const attr = (el, name) => { const v = el.getAttribute(name); return v === null ? undefined : v; };
return Array.from(document.querySelectorAll(CANDIDATES)).map((el) => {
  const tag = el.tagName.toLowerCase();
  const role = attr(el, 'role');
  const style = window.getComputedStyle(el);
  const rect = el.getBoundingClientRect();
  const interactive = INTERACTIVE_TAGS.has(tag)
    || (role !== undefined && INTERACTIVE_ROLES.has(role))
    || el.hasAttribute('onclick')
    || el.isContentEditable
    || (el.tabIndex >= 0 && el.hasAttribute('tabindex'));
  return {
    handle: stamp(el),
    tag: tag,
    role: role,
    text: (el.innerText || el.textContent || '').trim(),
    attributes: {
      id: el.id || undefined,
      class: typeof el.className === 'string' && el.className ? el.className : undefined,
      name: attr(el, 'name'),
      type: attr(el, 'type'),
      placeholder: attr(el, 'placeholder'),
      ariaLabel: attr(el, 'aria-label'),
      href: attr(el, 'href'),
      value: 'value' in el && typeof el.value === 'string' && el.value ? el.value : undefined,
      title: attr(el, 'title')
    },
    interactive: interactive,
    visible: style.display !== 'none' && style.visibility !== 'hidden' && style.opacity !== '0',
    boundingBox: { x: rect.x, y: rect.y, width: rect.width, height: rect.height }
  };
});
"#;

/// Wrap `body` with the prelude in an immediately-invoked function.
fn wrap(body: &str) -> String {
    format!(
        "(() => {{\nconst ATTR = '{}';{}\n{}\n}})()",
        HANDLE_ATTRIBUTE, PRELUDE, body
    )
}

/// JSON-encode a string as a JavaScript literal.
fn literal(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

pub fn page_info() -> String {
    PAGE_INFO.to_string()
}

pub fn elements() -> String {
    wrap(ELEMENTS_BODY)
}

/// Resolves to the element's handle, or `null` when nothing matches.
pub fn query_selector(selector: &str) -> String {
    wrap(&format!(
        "const el = document.querySelector({});\nreturn el ? stamp(el) : null;",
        literal(selector)
    ))
}

/// Resolves to `false` when the handle no longer exists.
pub fn click(handle: ElementHandle) -> String {
    wrap(&format!(
        "const el = byHandle({});\nif (!el) return false;\nel.scrollIntoView({{block: 'center', inline: 'center'}});\nif (typeof el.focus === 'function') el.focus();\nel.click();\nreturn true;",
        handle.0
    ))
}

/// Sets the value through the native setter so frameworks observe it.
pub fn set_value(handle: ElementHandle, value: &str) -> String {
    wrap(&format!(
        r#"const el = byHandle({});
if (!el) return false;
el.focus();
const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
const setter = Object.getOwnPropertyDescriptor(proto, 'value');
if (setter && setter.set && (el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement)) {{
  setter.set.call(el, {value});
}} else if (el.isContentEditable) {{
  el.textContent = {value};
}} else {{
  el.value = {value};
}}
el.dispatchEvent(new Event('input', {{bubbles: true}}));
el.dispatchEvent(new Event('change', {{bubbles: true}}));
return true;"#,
        handle.0,
        value = literal(value)
    ))
}

pub fn scroll_by(dx: f64, dy: f64) -> String {
    format!("window.scrollBy({{left: {}, top: {}, behavior: 'instant'}})", dx, dy)
}

pub fn scroll_to_top() -> String {
    "window.scrollTo({top: 0, behavior: 'instant'})".to_string()
}

pub fn scroll_to_bottom() -> String {
    "window.scrollTo({top: document.documentElement.scrollHeight, behavior: 'instant'})".to_string()
}

/// Text of an element; `null` when the handle is gone.
pub fn read_text(handle: Option<ElementHandle>) -> String {
    match handle {
        Some(handle) => wrap(&format!(
            "const el = byHandle({});\nreturn el ? (el.innerText || el.textContent || '') : null;",
            handle.0
        )),
        None => "document.body ? document.body.innerText : ''".to_string(),
    }
}

pub fn inject_style(css: &str) -> String {
    format!(
        "(() => {{ const s = document.createElement('style'); s.setAttribute('data-pagehand', 'style'); s.textContent = {}; (document.head || document.documentElement).appendChild(s); return true; }})()",
        literal(css)
    )
}

/// Wrap sandboxed code so its completion value comes back as a string.
pub fn sandboxed(code: &str) -> String {
    format!(
        "(async () => {{ const r = await (async () => {{ {} }})(); return r === undefined ? '' : String(r); }})()",
        code
    )
}
