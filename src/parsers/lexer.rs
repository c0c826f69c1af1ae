//! Byte-level tokenizer for PHP-style source text.
//!
//! Produces a flat token stream good enough for declaration spotting. It is
//! lossless: concatenating every token's text reproduces the input.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Namespace,
    Class,
    Interface,
    Trait,
    Enum,
    /// Any other reserved word (`extends`, `function`, `new`, ...).
    Other,
}

impl Keyword {
    fn classify(word: &str) -> Option<Keyword> {
        let lower = word.to_ascii_lowercase();
        let keyword = match lower.as_str() {
            "namespace" => Keyword::Namespace,
            "class" => Keyword::Class,
            "interface" => Keyword::Interface,
            "trait" => Keyword::Trait,
            "enum" => Keyword::Enum,
            other if RESERVED.contains(&other) => Keyword::Other,
            _ => return None,
        };
        Some(keyword)
    }
}

const RESERVED: &[&str] = &[
    "abstract", "and", "array", "as", "break", "callable", "case", "catch", "clone", "const",
    "continue", "declare", "default", "do", "echo", "else", "elseif", "empty", "enddeclare",
    "endfor", "endforeach", "endif", "endswitch", "endwhile", "eval", "exit", "extends", "final",
    "finally", "fn", "for", "foreach", "function", "global", "goto", "if", "implements",
    "include", "include_once", "instanceof", "insteadof", "isset", "list", "match", "new", "or",
    "print", "private", "protected", "public", "readonly", "require", "require_once", "return",
    "static", "switch", "throw", "try", "unset", "use", "var", "while", "xor", "yield",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    InlineHtml,
    OpenTag,
    CloseTag,
    Whitespace,
    Comment,
    Keyword(Keyword),
    /// Bare identifier such as `Foo`.
    Identifier,
    /// `Foo\Bar`, `\Foo\Bar` or `namespace\Foo`.
    QualifiedName,
    Variable,
    Number,
    StringLiteral,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Html,
    Code,
}

pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    pos: usize,
    mode: Mode,
    /// Set after `->` / `?->`, where keywords are plain member names.
    member_access: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            mode: Mode::Html,
            member_access: false,
        }
    }

    pub fn next_token(&mut self) -> Option<Token<'src>> {
        if self.pos >= self.bytes.len() {
            return None;
        }
        let start = self.pos;
        let kind = match self.mode {
            Mode::Html => self.lex_html(),
            Mode::Code => self.lex_code(),
        };
        // Never stall: every branch must consume at least one byte.
        if self.pos == start {
            self.advance_char();
        }
        Some(Token {
            kind,
            text: &self.source[start..self.pos],
        })
    }

    fn lex_html(&mut self) -> TokenKind {
        if let Some(len) = self.open_tag_len(self.pos) {
            self.pos += len;
            self.mode = Mode::Code;
            return TokenKind::OpenTag;
        }
        while self.pos < self.bytes.len() && self.open_tag_len(self.pos).is_none() {
            self.pos += 1;
        }
        self.align_to_char_boundary();
        TokenKind::InlineHtml
    }

    fn open_tag_len(&self, at: usize) -> Option<usize> {
        let rest = &self.bytes[at..];
        if rest.starts_with(b"<?=") {
            return Some(3);
        }
        if rest.len() >= 5 && rest[..5].eq_ignore_ascii_case(b"<?php") {
            return match rest.get(5) {
                None => Some(5),
                Some(b'\n') => Some(6),
                Some(b'\r') if rest.get(6) == Some(&b'\n') => Some(7),
                Some(c) if c.is_ascii_whitespace() => Some(6),
                Some(_) => None,
            };
        }
        None
    }

    fn lex_code(&mut self) -> TokenKind {
        let member_access = std::mem::replace(&mut self.member_access, false);
        let b = self.bytes[self.pos];
        match b {
            b' ' | b'\t' | b'\r' | b'\n' | b'\x0c' => {
                while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
                    self.pos += 1;
                }
                // Whitespace does not end a member access: `$a-> class`.
                self.member_access = member_access;
                TokenKind::Whitespace
            }
            b'?' if self.peek(1) == Some(b'>') => {
                self.pos += 2;
                if self.peek(0) == Some(b'\n') {
                    self.pos += 1;
                }
                self.mode = Mode::Html;
                TokenKind::CloseTag
            }
            b'#' if self.peek(1) == Some(b'[') => {
                self.pos += 2;
                TokenKind::Punct
            }
            b'#' => self.lex_line_comment(),
            b'/' if self.peek(1) == Some(b'/') => self.lex_line_comment(),
            b'/' if self.peek(1) == Some(b'*') => self.lex_block_comment(),
            b'\'' | b'"' | b'`' => self.lex_quoted(b),
            b'<' if self.bytes[self.pos..].starts_with(b"<<<") => self.lex_heredoc(),
            b'$' if self.peek(1).is_some_and(is_name_start) => {
                self.pos += 1;
                self.eat_name();
                TokenKind::Variable
            }
            b'0'..=b'9' => {
                while self
                    .peek(0)
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'.')
                {
                    self.pos += 1;
                }
                TokenKind::Number
            }
            b'\\' if self.peek(1).is_some_and(is_name_start) => {
                self.eat_qualified_name();
                TokenKind::QualifiedName
            }
            c if is_name_start(c) => self.lex_name(member_access),
            b'-' if self.peek(1) == Some(b'>') => {
                self.pos += 2;
                self.member_access = true;
                TokenKind::Punct
            }
            b'?' if self.bytes[self.pos..].starts_with(b"?->") => {
                self.pos += 3;
                self.member_access = true;
                TokenKind::Punct
            }
            b':' if self.peek(1) == Some(b':') => {
                self.pos += 2;
                TokenKind::Punct
            }
            _ => {
                self.advance_char();
                TokenKind::Punct
            }
        }
    }

    fn lex_name(&mut self, member_access: bool) -> TokenKind {
        let start = self.pos;
        self.eat_name();
        if self.peek(0) == Some(b'\\') && self.peek(1).is_some_and(is_name_start) {
            self.eat_qualified_name();
            return TokenKind::QualifiedName;
        }
        if member_access {
            return TokenKind::Identifier;
        }
        match Keyword::classify(&self.source[start..self.pos]) {
            Some(Keyword::Enum) if !self.enum_declaration_follows() => TokenKind::Identifier,
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier,
        }
    }

    /// `enum` is a soft keyword: it only opens a declaration when whitespace
    /// and a name other than `extends`/`implements` follow, so `class Enum`
    /// and `Enum::CASE` keep it as a plain name.
    fn enum_declaration_follows(&self) -> bool {
        let bytes = self.bytes;
        let mut cursor = self.pos;
        while bytes.get(cursor).is_some_and(u8::is_ascii_whitespace) {
            cursor += 1;
        }
        if cursor == self.pos || !bytes.get(cursor).copied().is_some_and(is_name_start) {
            return false;
        }
        let name_start = cursor;
        while bytes.get(cursor).copied().is_some_and(is_name_char) {
            cursor += 1;
        }
        let name = &bytes[name_start..cursor];
        !(name.eq_ignore_ascii_case(b"extends") || name.eq_ignore_ascii_case(b"implements"))
    }

    fn lex_line_comment(&mut self) -> TokenKind {
        while let Some(c) = self.peek(0) {
            if c == b'\n' || self.bytes[self.pos..].starts_with(b"?>") {
                break;
            }
            self.pos += 1;
        }
        self.align_to_char_boundary();
        TokenKind::Comment
    }

    fn lex_block_comment(&mut self) -> TokenKind {
        self.pos += 2;
        match find(&self.bytes[self.pos..], b"*/") {
            Some(offset) => self.pos += offset + 2,
            None => self.pos = self.bytes.len(),
        }
        TokenKind::Comment
    }

    fn lex_quoted(&mut self, quote: u8) -> TokenKind {
        self.pos += 1;
        while let Some(c) = self.peek(0) {
            self.pos += 1;
            if c == b'\\' {
                self.pos = (self.pos + 1).min(self.bytes.len());
            } else if c == quote {
                break;
            }
        }
        self.align_to_char_boundary();
        TokenKind::StringLiteral
    }

    /// Heredoc and nowdoc bodies run until a line whose first non-blank text
    /// is the label followed by a non-name character.
    fn lex_heredoc(&mut self) -> TokenKind {
        let bytes = self.bytes;
        let start = self.pos;
        self.pos += 3;
        while matches!(self.peek(0), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
        let quote = match self.peek(0) {
            Some(q @ (b'\'' | b'"')) => {
                self.pos += 1;
                Some(q)
            }
            _ => None,
        };
        let label_start = self.pos;
        if !self.peek(0).is_some_and(is_name_start) {
            // Plain `<<` shift followed by `<`.
            self.pos = start + 1;
            return TokenKind::Punct;
        }
        self.eat_name();
        let label = &bytes[label_start..self.pos];
        if let Some(q) = quote {
            if self.peek(0) == Some(q) {
                self.pos += 1;
            }
        }

        let mut line_start = match find(&bytes[self.pos..], b"\n") {
            Some(offset) => self.pos + offset + 1,
            None => {
                self.pos = bytes.len();
                return TokenKind::StringLiteral;
            }
        };

        loop {
            let mut cursor = line_start;
            while matches!(bytes.get(cursor), Some(b' ' | b'\t')) {
                cursor += 1;
            }
            let rest = &bytes[cursor..];
            if rest.starts_with(label) && !rest.get(label.len()).copied().is_some_and(is_name_char)
            {
                self.pos = cursor + label.len();
                return TokenKind::StringLiteral;
            }
            match find(&bytes[line_start..], b"\n") {
                Some(offset) => line_start += offset + 1,
                None => {
                    self.pos = bytes.len();
                    return TokenKind::StringLiteral;
                }
            }
        }
    }

    fn eat_name(&mut self) {
        while self.peek(0).is_some_and(is_name_char) {
            self.pos += 1;
        }
    }

    fn eat_qualified_name(&mut self) {
        loop {
            if self.peek(0) == Some(b'\\') && self.peek(1).is_some_and(is_name_start) {
                self.pos += 1;
            }
            let before = self.pos;
            self.eat_name();
            if self.pos == before || self.peek(0) != Some(b'\\') {
                break;
            }
            if !self.peek(1).is_some_and(is_name_start) {
                break;
            }
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance_char(&mut self) {
        self.pos += 1;
        self.align_to_char_boundary();
    }

    fn align_to_char_boundary(&mut self) {
        while self.pos < self.bytes.len() && !self.source.is_char_boundary(self.pos) {
            self.pos += 1;
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Tokenize a whole file.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    Lexer::new(source).collect()
}

fn is_name_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c >= 0x80
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c >= 0x80
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
