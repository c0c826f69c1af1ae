pub mod lexer;
pub mod php;

pub use php::PhpDeclarationExtractor;

/// Finds the type declarations a single source file contributes.
///
/// Implementations work on raw text so the scan/cache/resolve protocol never
/// needs to know which grammar is being indexed.
pub trait DeclarationExtractor: Send + Sync {
    /// Namespace-qualified identifiers declared in `source`, in source order.
    fn extract(&self, source: &str) -> Vec<String>;
    fn language_name(&self) -> &str;
}
