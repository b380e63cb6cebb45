//! Page scripts shared by every evaluate-based backend.
//!
//! Each builder returns a self-invoking expression. Locators are either CSS
//! selectors or `xpath=`-prefixed XPath expressions; the `__all` prelude
//! resolves both. Scripts that act on an element report `{ status }` so the
//! caller can map the outcome onto an [`ActionError`].

use crate::errors::ActionError;
use serde_json::Value;

const RESOLVE_PRELUDE: &str = r#"const __all = (loc) => {
    if (loc.startsWith('xpath=')) {
        const snap = document.evaluate(loc.slice(6), document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
        const out = [];
        for (let i = 0; i < snap.snapshotLength; i++) { out.push(snap.snapshotItem(i)); }
        return out;
    }
    try { return Array.from(document.querySelectorAll(loc)); } catch (e) { return []; }
};
const __visible = (el) => {
    const rect = el.getBoundingClientRect();
    if (rect.width === 0 || rect.height === 0) { return false; }
    const style = window.getComputedStyle(el);
    return style.visibility !== 'hidden' && style.display !== 'none';
};"#;

fn literal(value: &str) -> Result<String, ActionError> {
    serde_json::to_string(value)
        .map_err(|err| ActionError::Internal(format!("invalid script literal: {}", err)))
}

/// Number of elements matching `locator`, optionally counting only visible ones.
pub fn count(locator: &str, visible_only: bool) -> Result<String, ActionError> {
    Ok(format!(
        "(() => {{\n{prelude}\nconst els = __all({loc});\nreturn {visible} ? els.filter(__visible).length : els.length;\n}})()",
        prelude = RESOLVE_PRELUDE,
        loc = literal(locator)?,
        visible = visible_only,
    ))
}

/// Scroll the first match into view and click it.
pub fn click(locator: &str) -> Result<String, ActionError> {
    Ok(format!(
        "(() => {{\n{prelude}\nconst el = __all({loc})[0];\nif (!el) {{ return {{ status: 'missing' }}; }}\nif (el.disabled) {{ return {{ status: 'disabled' }}; }}\nel.scrollIntoView({{ block: 'center', inline: 'center' }});\nel.click();\nreturn {{ status: 'ok' }};\n}})()",
        prelude = RESOLVE_PRELUDE,
        loc = literal(locator)?,
    ))
}

/// Bring a radio/checkbox to `checked` through a real click so page handlers fire.
pub fn set_checked(locator: &str, checked: bool) -> Result<String, ActionError> {
    Ok(format!(
        "(() => {{\n{prelude}\nconst el = __all({loc})[0];\nif (!el) {{ return {{ status: 'missing' }}; }}\nif (!('checked' in el)) {{ return {{ status: 'not-toggle' }}; }}\nif (el.checked !== {checked}) {{ el.click(); }}\nif (el.checked !== {checked}) {{ el.checked = {checked}; el.dispatchEvent(new Event('change', {{ bubbles: true }})); }}\nreturn {{ status: 'ok' }};\n}})()",
        prelude = RESOLVE_PRELUDE,
        loc = literal(locator)?,
        checked = checked,
    ))
}

/// Replace the field value using the native setter and emit input/change events.
pub fn fill(locator: &str, value: &str) -> Result<String, ActionError> {
    Ok(format!(
        "(() => {{\n{prelude}\nconst el = __all({loc})[0];\nif (!el) {{ return {{ status: 'missing' }}; }}\nif (el.disabled || el.readOnly) {{ return {{ status: 'disabled' }}; }}\nel.focus();\nconst proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;\nconst setter = Object.getOwnPropertyDescriptor(proto, 'value');\nif (setter && setter.set && (el.tagName === 'INPUT' || el.tagName === 'TEXTAREA')) {{ setter.set.call(el, {value}); }}\nelse if (el.isContentEditable) {{ el.textContent = {value}; }}\nelse {{ el.value = {value}; }}\nel.dispatchEvent(new Event('input', {{ bubbles: true }}));\nel.dispatchEvent(new Event('change', {{ bubbles: true }}));\nreturn {{ status: 'ok' }};\n}})()",
        prelude = RESOLVE_PRELUDE,
        loc = literal(locator)?,
        value = literal(value)?,
    ))
}

/// Select the option whose visible label equals `label` (trimmed).
pub fn select_option(locator: &str, label: &str) -> Result<String, ActionError> {
    Ok(format!(
        "(() => {{\n{prelude}\nconst el = __all({loc})[0];\nif (!el) {{ return {{ status: 'missing' }}; }}\nconst target = {label}.trim();\nconst options = Array.from(el.options || []);\nconst opt = options.find(o => (o.label || o.text || '').trim() === target) || options.find(o => (o.text || '').trim() === target);\nif (!opt) {{ return {{ status: 'not-found' }}; }}\nel.value = opt.value;\nopt.selected = true;\nel.dispatchEvent(new Event('input', {{ bubbles: true }}));\nel.dispatchEvent(new Event('change', {{ bubbles: true }}));\nreturn {{ status: 'ok' }};\n}})()",
        prelude = RESOLVE_PRELUDE,
        loc = literal(locator)?,
        label = literal(label)?,
    ))
}

/// Dispatch a key to the element; Enter additionally submits the owning form.
pub fn press(locator: &str, key: &str) -> Result<String, ActionError> {
    Ok(format!(
        "(() => {{\n{prelude}\nconst el = __all({loc})[0];\nif (!el) {{ return {{ status: 'missing' }}; }}\nel.focus();\nconst key = {key};\nconst init = {{ key, bubbles: true, cancelable: true }};\nconst down = el.dispatchEvent(new KeyboardEvent('keydown', init));\nel.dispatchEvent(new KeyboardEvent('keypress', init));\nel.dispatchEvent(new KeyboardEvent('keyup', init));\nif (down && key === 'Enter' && el.form) {{\n  if (typeof el.form.requestSubmit === 'function') {{ el.form.requestSubmit(); }} else {{ el.form.submit(); }}\n}}\nreturn {{ status: 'ok' }};\n}})()",
        prelude = RESOLVE_PRELUDE,
        loc = literal(locator)?,
        key = literal(key)?,
    ))
}

pub fn scroll_by(dx: i64, dy: i64) -> String {
    format!("(() => {{ window.scrollBy({dx}, {dy}); return {{ status: 'ok' }}; }})()")
}

/// Tag, type, value and checked state of the first match.
pub fn probe(locator: &str) -> Result<String, ActionError> {
    Ok(format!(
        "(() => {{\n{prelude}\nconst el = __all({loc})[0];\nif (!el) {{ return null; }}\nconst tag = (el.tagName || '').toLowerCase();\nconst selected = tag === 'select' && el.selectedIndex >= 0 ? (el.options[el.selectedIndex].text || '').trim() : null;\nreturn {{\n  tag,\n  inputType: el.type ? String(el.type).toLowerCase() : null,\n  value: 'value' in el ? String(el.value) : null,\n  selectedText: selected,\n  checked: 'checked' in el ? !!el.checked : null,\n  visible: __visible(el),\n  disabled: !!el.disabled,\n  text: (el.innerText || el.textContent || '').replace(/\\s+/g, ' ').trim().slice(0, 200),\n}};\n}})()",
        prelude = RESOLVE_PRELUDE,
        loc = literal(locator)?,
    ))
}

/// Document readiness plus the in-flight resource count seen by the performance timeline.
pub const READY_STATE: &str = "(() => ({ readyState: document.readyState, resources: performance.getEntriesByType('resource').length }))()";

/// Enumerate visible interactive elements with their labels and nearest container.
pub const SCAN_INTERACTIVE: &str = r#"(() => {
const SELECTORS = [
    'input:not([type="hidden"])', 'button', 'select', 'textarea', 'a[href]',
    '[role="button"]', '[role="link"]', '[role="textbox"]', '[role="combobox"]',
    '[role="listbox"]', '[role="radio"]', '[role="checkbox"]'
];
const CONTAINERS = 'form, fieldset, section, article, dialog, [role="dialog"], [role="region"], [role="group"], tr, li';
const clean = (s) => (s || '').replace(/\s+/g, ' ').trim();
const attr = (el, name) => { const v = el.getAttribute(name); return v && v.trim() ? v.trim() : null; };
const isVisible = (el) => {
    const rect = el.getBoundingClientRect();
    if (rect.width === 0 || rect.height === 0) { return false; }
    const style = window.getComputedStyle(el);
    if (style.visibility === 'hidden' || style.display === 'none') { return false; }
    return el.offsetParent !== null || style.position === 'fixed';
};
const labelFor = (el) => {
    if (el.labels && el.labels.length) { const t = clean(el.labels[0].textContent); if (t) { return t; } }
    const wrap = el.closest('label');
    if (wrap) { const t = clean(wrap.textContent); if (t) { return t; } }
    const by = attr(el, 'aria-labelledby');
    if (by) {
        const t = clean(by.split(/\s+/).map(id => { const n = document.getElementById(id); return n ? n.textContent : ''; }).join(' '));
        if (t) { return t; }
    }
    return null;
};
const containerOf = (el) => {
    const c = el.parentElement ? el.parentElement.closest(CONTAINERS) : null;
    if (!c) { return null; }
    const tag = c.tagName.toLowerCase();
    const kind = tag === 'tr' ? 'row' : tag === 'li' ? 'item' : (attr(c, 'role') || tag);
    let text = null;
    const heading = c.querySelector('legend, caption, h1, h2, h3, h4, h5, h6, [role="heading"]');
    if (heading) { text = clean(heading.textContent) || null; }
    if (!text) { text = attr(c, 'aria-label'); }
    if (!text && c.previousElementSibling && /^H[1-6]$/.test(c.previousElementSibling.tagName)) {
        text = clean(c.previousElementSibling.textContent) || null;
    }
    return { kind, text, id: c.id || null };
};
const seen = new Set();
const out = [];
for (const sel of SELECTORS) {
    for (const el of document.querySelectorAll(sel)) {
        if (seen.has(el)) { continue; }
        seen.add(el);
        if (!isVisible(el)) { continue; }
        const tag = el.tagName.toLowerCase();
        const formLike = tag === 'input' || tag === 'select' || tag === 'textarea';
        out.push({
            el,
            data: {
                tag,
                inputType: tag === 'input' ? (attr(el, 'type') || 'text').toLowerCase() : null,
                role: attr(el, 'role'),
                id: el.id || null,
                name: attr(el, 'name'),
                className: typeof el.className === 'string' ? (el.className.trim() || null) : null,
                text: formLike ? null : (clean(el.textContent).slice(0, 100) || null),
                label: labelFor(el),
                placeholder: attr(el, 'placeholder'),
                title: attr(el, 'title'),
                ariaLabel: attr(el, 'aria-label'),
                value: tag === 'input' || tag === 'button' ? attr(el, 'value') : null,
                href: tag === 'a' ? attr(el, 'href') : null,
                container: containerOf(el),
            },
        });
    }
}
out.sort((a, b) => {
    if (a.el === b.el) { return 0; }
    return a.el.compareDocumentPosition(b.el) & Node.DOCUMENT_POSITION_FOLLOWING ? -1 : 1;
});
return out.map(e => e.data);
})()"#;

/// Visible text of elements that look like form-validation errors.
pub const SCAN_VALIDATION_MESSAGES: &str = r#"(() => {
const SELECTORS = [
    '[role="alert"]', '.error', '.errors', '.error-message', '.field-error', '.form-error',
    '.invalid-feedback', '.help-block.error', '.alert-danger', '.validation-error',
    '[class*="error-text"]', '[class*="errorMessage"]', '[aria-live="assertive"]'
];
const clean = (s) => (s || '').replace(/\s+/g, ' ').trim();
const visible = (el) => {
    const rect = el.getBoundingClientRect();
    if (rect.width === 0 || rect.height === 0) { return false; }
    const style = window.getComputedStyle(el);
    return style.visibility !== 'hidden' && style.display !== 'none';
};
const out = [];
const seen = new Set();
for (const sel of SELECTORS) {
    for (const el of document.querySelectorAll(sel)) {
        if (seen.has(el) || !visible(el)) { continue; }
        seen.add(el);
        const text = clean(el.innerText || el.textContent);
        if (text) { out.push(text); }
    }
}
for (const el of document.querySelectorAll('[aria-invalid="true"]')) {
    const by = el.getAttribute('aria-describedby');
    const described = by ? clean(by.split(/\s+/).map(id => { const n = document.getElementById(id); return n ? n.textContent : ''; }).join(' ')) : '';
    const text = described || clean(el.validationMessage);
    if (text) { out.push(text); }
}
return out;
})()"#;

/// Extract `status` from a `{ status }` script result.
pub fn status_of(value: &Value) -> &str {
    value
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
}

/// Map a `{ status }` script result for an element action onto an error.
pub fn check_status(value: &Value, locator: &str) -> Result<(), ActionError> {
    match status_of(value) {
        "ok" => Ok(()),
        "missing" => Err(ActionError::AnchorNotFound(format!(
            "No element matches '{}'",
            locator
        ))),
        "disabled" => Err(ActionError::NotEnabled(format!(
            "Element '{}' is disabled",
            locator
        ))),
        "not-toggle" => Err(ActionError::NotClickable(format!(
            "Element '{}' has no checked state",
            locator
        ))),
        "not-found" => Err(ActionError::OptionNotFound(format!(
            "No matching option in '{}'",
            locator
        ))),
        other => Err(ActionError::Script(format!(
            "Unexpected script status '{}' for '{}'",
            other, locator
        ))),
    }
}
