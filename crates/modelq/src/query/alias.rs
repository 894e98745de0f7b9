use crate::dialect::JoinType;

/// What one query alias stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTarget {
    pub alias: String,
    /// [`Entity::NAME`](crate::Entity::NAME) of the aliased entity.
    pub entity: &'static str,
    pub table: &'static str,
    /// `None` for the root alias.
    pub join_type: Option<JoinType>,
    /// Relationship on the root entity this alias hydrates into. Empty for
    /// the root alias.
    pub relation: String,
}

impl AliasTarget {
    pub fn root(entity: &'static str, table: &'static str) -> Self {
        Self {
            alias: entity.to_string(),
            entity,
            table,
            join_type: None,
            relation: String::new(),
        }
    }

    pub fn join(
        alias: impl Into<String>,
        entity: &'static str,
        table: &'static str,
        join_type: JoinType,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            entity,
            table,
            join_type: Some(join_type),
            relation: relation.into(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.join_type.is_none()
    }
}

/// Output-column prefix to alias target.
///
/// The empty prefix and the root entity name both resolve to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasMap {
    root: AliasTarget,
    joins: Vec<AliasTarget>,
}

impl AliasMap {
    pub fn new(entity: &'static str, table: &'static str) -> Self {
        Self {
            root: AliasTarget::root(entity, table),
            joins: Vec::new(),
        }
    }

    /// Add a join target. A target with an existing alias replaces it.
    pub(crate) fn insert(&mut self, target: AliasTarget) {
        match self.joins.iter_mut().find(|t| t.alias == target.alias) {
            Some(existing) => *existing = target,
            None => self.joins.push(target),
        }
    }

    pub fn get(&self, prefix: &str) -> Option<&AliasTarget> {
        if prefix.is_empty() || prefix == self.root.alias {
            return Some(&self.root);
        }
        self.joins.iter().find(|t| t.alias == prefix)
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.get(prefix).is_some()
    }

    pub fn root(&self) -> &AliasTarget {
        &self.root
    }

    pub fn joins(&self) -> &[AliasTarget] {
        &self.joins
    }

    /// All aliases, root first.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.root.alias.as_str()).chain(self.joins.iter().map(|t| t.alias.as_str()))
    }

    /// Number of aliases including the root.
    pub fn len(&self) -> usize {
        1 + self.joins.len()
    }
}
