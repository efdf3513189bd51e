use std::collections::HashMap;

/// Named class of surface, e.g. `ground` or `star`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub String);

impl MaterialId {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn ground() -> Self {
        Self::new("ground")
    }

    pub fn star() -> Self {
        Self::new("star")
    }
}

/// Friction/restitution used when two material classes touch
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactMaterial {
    pub friction: f32,
    pub restitution: f32,
}

impl ContactMaterial {
    /// Coefficients for pairs without an explicit rule
    pub const DEFAULT: ContactMaterial = ContactMaterial {
        friction: 0.3,
        restitution: 0.0,
    };
}

/// Symmetric table of contact rules between material classes
#[derive(Clone, Debug, Default)]
pub struct MaterialTable {
    rules: HashMap<(MaterialId, MaterialId), ContactMaterial>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: &MaterialId, b: &MaterialId) -> (MaterialId, MaterialId) {
        if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        }
    }

    pub fn add(&mut self, a: &MaterialId, b: &MaterialId, material: ContactMaterial) {
        self.rules.insert(Self::key(a, b), material);
    }

    /// Explicit rule for the pair, if any
    pub fn get(&self, a: &MaterialId, b: &MaterialId) -> Option<ContactMaterial> {
        self.rules.get(&Self::key(a, b)).copied()
    }

    /// Rule for the pair, falling back to [`ContactMaterial::DEFAULT`]
    pub fn resolve(&self, a: &MaterialId, b: &MaterialId) -> ContactMaterial {
        self.get(a, b).unwrap_or(ContactMaterial::DEFAULT)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
