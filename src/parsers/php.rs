use super::lexer::{tokenize, Keyword, Token, TokenKind};
use super::DeclarationExtractor;

const NAMESPACE_SEPARATOR: char = '\\';

/// Spots `class`/`interface`/`trait`/`enum` declarations in PHP source.
///
/// This is pattern matching over the token stream, not a parse: a
/// declaration is a declaration keyword, one whitespace token, then a bare
/// identifier. Only the first `namespace` statement in a file is honoured;
/// anything declared after a second one is still prefixed with the first.
pub struct PhpDeclarationExtractor {
    declaration_keywords: Vec<Keyword>,
}

enum NamespaceState {
    Pending,
    Gathering(String),
    Resolved(String),
}

impl NamespaceState {
    fn prefix(&self) -> &str {
        match self {
            NamespaceState::Resolved(prefix) => prefix,
            _ => "",
        }
    }
}

impl PhpDeclarationExtractor {
    pub fn new() -> Self {
        Self {
            declaration_keywords: vec![
                Keyword::Class,
                Keyword::Interface,
                Keyword::Trait,
                Keyword::Enum,
            ],
        }
    }

    fn is_declaration_keyword(&self, token: &Token<'_>) -> bool {
        matches!(token.kind, TokenKind::Keyword(keyword) if self.declaration_keywords.contains(&keyword))
    }

    fn is_declaration_at(&self, tokens: &[Token<'_>], index: usize) -> bool {
        index >= 2
            && self.is_declaration_keyword(&tokens[index - 2])
            && tokens[index - 1].kind == TokenKind::Whitespace
            && tokens[index].kind == TokenKind::Identifier
    }
}

impl Default for PhpDeclarationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclarationExtractor for PhpDeclarationExtractor {
    fn extract(&self, source: &str) -> Vec<String> {
        let tokens = tokenize(source);
        let mut gathered = Vec::new();
        let mut namespace = NamespaceState::Pending;

        for (index, token) in tokens.iter().enumerate() {
            let next = match &mut namespace {
                NamespaceState::Pending if token.kind == TokenKind::Keyword(Keyword::Namespace) => {
                    Some(NamespaceState::Gathering(String::new()))
                }
                NamespaceState::Gathering(buffer) => {
                    if is_namespace_terminator(token) {
                        Some(NamespaceState::Resolved(namespace_prefix(buffer)))
                    } else {
                        if token.kind != TokenKind::Comment {
                            buffer.push_str(token.text);
                        }
                        None
                    }
                }
                _ => None,
            };
            if let Some(next) = next {
                namespace = next;
            }

            if self.is_declaration_at(&tokens, index) {
                gathered.push(format!("{}{}", namespace.prefix(), token.text));
            }
        }

        gathered
    }

    fn language_name(&self) -> &str {
        "php"
    }
}

fn is_namespace_terminator(token: &Token<'_>) -> bool {
    token.kind == TokenKind::Punct && (token.text == ";" || token.text == "{")
}

fn namespace_prefix(raw: &str) -> String {
    let name = raw.trim_matches(|c: char| c.is_whitespace() || c == ';' || c == NAMESPACE_SEPARATOR);
    if name.is_empty() {
        // `namespace { ... }` is the global namespace.
        String::new()
    } else {
        format!("{}{}", name, NAMESPACE_SEPARATOR)
    }
}
