/// A member of the host's name-resolution chain.
///
/// `true` means the declaration is now available in the running process;
/// `false` means "not mine" and lets the next member try.
pub trait SymbolResolver {
    fn resolve(&mut self, name: &str) -> bool;
}

impl<F> SymbolResolver for F
where
    F: FnMut(&str) -> bool,
{
    fn resolve(&mut self, name: &str) -> bool {
        self(name)
    }
}

/// Ordered list of resolvers consulted whenever an unknown name is referenced.
#[derive(Default)]
pub struct ResolverChain {
    members: Vec<Box<dyn SymbolResolver>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append<R: SymbolResolver + 'static>(&mut self, resolver: R) {
        self.members.push(Box::new(resolver));
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Ask each member in registration order; the first hit wins.
    pub fn resolve(&mut self, name: &str) -> bool {
        self.members.iter_mut().any(|member| member.resolve(name))
    }
}
