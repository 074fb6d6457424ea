//! Chat bubble rendering for the web demo.
//!
//! Turns one chat message, possibly holding fenced code blocks, into an HTML
//! fragment. Lines outside a fence are joined with `<br>`; lines inside a fence
//! are escaped so the browser shows them verbatim.

const FENCE: &str = "```";

/// Substitutions applied to a line inside an open fence, in order.
/// No replacement contains a character matched by a later entry.
const CODE_ESCAPES: [(char, &str); 12] = [
    ('`', "\\`"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    (' ', "&nbsp;"),
    ('*', "&ast;"),
    ('_', "&lowbar;"),
    ('-', "&#45;"),
    ('.', "&#46;"),
    ('!', "&#33;"),
    ('(', "&#40;"),
    (')', "&#41;"),
    ('$', "&#36;"),
];

/// Render a chat message as an HTML fragment.
///
/// Empty lines are dropped. The first remaining line is emitted untouched;
/// every later line gets a `<br>` prefix. A line containing a triple backtick
/// toggles code mode: opening fences become `<pre><code class="language-..">`
/// with the text after the last backtick as the language, closing fences become
/// `<br></code></pre>`. An unbalanced fence keeps code mode on until the end of
/// this call only.
pub fn render_chat_text(text: &str) -> String {
    let mut fences = 0usize;
    let mut html = String::with_capacity(text.len());

    for (i, line) in text.split('\n').filter(|line| !line.is_empty()).enumerate() {
        if line.contains(FENCE) {
            fences += 1;
            if fences % 2 == 1 {
                let language = line.rsplit('`').next().unwrap_or_default();
                html.push_str("<pre><code class=\"language-");
                html.push_str(language);
                html.push_str("\">");
            } else {
                html.push_str("<br></code></pre>");
            }
        } else if i == 0 {
            html.push_str(line);
        } else {
            html.push_str("<br>");
            if fences % 2 == 1 {
                html.push_str(&escape_code_line(line));
            } else {
                html.push_str(line);
            }
        }
    }

    html
}

/// Escape one line of code for fixed-width HTML display.
pub fn escape_code_line(line: &str) -> String {
    CODE_ESCAPES
        .iter()
        .fold(line.to_string(), |acc, (from, to)| acc.replace(*from, to))
}
