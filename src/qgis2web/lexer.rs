//! Tokenizer for the script embedded in a QGIS2Web `index.html`
//!
//! Only what style reconstruction needs: identifiers, string and numeric
//! literals, punctuation. Comments and whitespace are dropped. Braces inside
//! string literals never reach the parser, which is what makes body extraction
//! reliable. Regex literals are not recognized (`/` is plain punctuation).
//!
//! Only `<script>` element contents are lexed (see [`script_blocks`]); markup
//! around them never reaches the tokenizer, so a stray quote or backtick in
//! page text cannot swallow the rule functions that follow.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Str,
    Number,
    Punct,
    /// String literal cut short by a newline or end of input
    Unterminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of the token in the source
    pub offset: usize,
}

impl<'a> Token<'a> {
    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }

    /// Contents of a string literal with escapes resolved
    pub fn string_value(&self) -> Option<String> {
        if self.kind != TokenKind::Str || self.text.len() < 2 {
            return None;
        }
        Some(unescape(&self.text[1..self.text.len() - 1]))
    }

    /// Numeric literal value; `None` for literals Rust cannot parse (hex, separators)
    pub fn number_value(&self) -> Option<f64> {
        if self.kind != TokenKind::Number {
            return None;
        }
        self.text.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    pub fn bool_value(&self) -> Option<bool> {
        match self.text {
            "true" if self.kind == TokenKind::Ident => Some(true),
            "false" if self.kind == TokenKind::Ident => Some(false),
            _ => None,
        }
    }
}

// Longest first so "===" wins over "=="
const OPERATORS: [&str; 14] = [
    "===", "!==", "...", "&&", "||", "==", "!=", "<=", ">=", "=>", "++", "--", "??", "?.",
];

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            }

            let rest = self.rest();
            if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if rest.starts_with("/*") {
                self.pos += rest[2..].find("*/").map(|i| i + 4).unwrap_or(rest.len());
            } else {
                return;
            }
        }
    }

    fn lex_string(&mut self, quote: char) -> TokenKind {
        self.bump();
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.bump();
                    self.bump();
                }
                '\n' if quote != '`' => return TokenKind::Unterminated,
                c if c == quote => {
                    self.bump();
                    return TokenKind::Str;
                }
                _ => {
                    self.bump();
                }
            }
        }
        TokenKind::Unterminated
    }

    fn lex_number(&mut self) {
        let mut previous = '\0';
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '+' || c == '-') && (previous == 'e' || previous == 'E');
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign {
                previous = c;
                self.bump();
            } else {
                break;
            }
        }
    }

    fn lex_ident(&mut self) {
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
    }

    fn lex_punct(&mut self) {
        let rest = self.rest();
        if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            self.pos += op.len();
        } else {
            self.bump();
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        self.skip_trivia();
        let start = self.pos;
        let c = self.peek()?;

        let kind = match c {
            '\'' | '"' | '`' => self.lex_string(c),
            c if c.is_ascii_digit() => {
                self.lex_number();
                TokenKind::Number
            }
            '.' if self.peek_second().is_some_and(|n| n.is_ascii_digit()) => {
                self.lex_number();
                TokenKind::Number
            }
            c if is_ident_start(c) => {
                self.lex_ident();
                TokenKind::Ident
            }
            _ => {
                self.lex_punct();
                TokenKind::Punct
            }
        };

        Some(Token {
            kind,
            text: &self.src[start..self.pos],
            offset: start,
        })
    }
}

pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    Lexer::new(src).collect()
}

/// Contents of the inline `<script>` elements of an HTML document, in order
///
/// Text without any `<script` tag is returned whole, so bare script sources
/// can be interpreted directly. An element missing its closing tag runs to
/// the end of the document.
pub fn script_blocks(html: &str) -> Vec<&str> {
    // ASCII lowercasing keeps byte offsets aligned with `html`
    let lower = html.to_ascii_lowercase();
    let mut blocks = Vec::new();
    let mut saw_tag = false;
    let mut pos = 0;

    while let Some(found) = lower[pos..].find("<script") {
        let tag_start = pos + found;
        let after_name = tag_start + "<script".len();
        if !lower[after_name..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c == '/' || c.is_ascii_whitespace())
        {
            pos = after_name;
            continue;
        }
        saw_tag = true;

        let Some(tag_end) = lower[after_name..].find('>').map(|i| after_name + i + 1) else {
            break;
        };
        let close = lower[tag_end..].find("</script").map(|i| tag_end + i);
        let content_end = close.unwrap_or(html.len());

        if !html[tag_end..content_end].trim().is_empty() {
            blocks.push(&html[tag_end..content_end]);
        }
        match close {
            Some(close) => pos = close + "</script".len(),
            None => break,
        }
    }

    if !saw_tag {
        blocks.push(html);
    }
    blocks
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric()
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            // Line continuation
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Index of the token closing the group opened at `open`
///
/// `open` must point at `open_punct`; nesting is tracked on tokens, so
/// delimiters inside strings and comments are ignored.
pub fn matching_close(tokens: &[Token<'_>], open: usize, open_punct: &str, close_punct: &str) -> Option<usize> {
    if !tokens.get(open)?.is_punct(open_punct) {
        return None;
    }

    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.is_punct(open_punct) {
            depth += 1;
        } else if token.is_punct(close_punct) {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}
