use crate::services::policy::types::EntityRef;

/// The entity a rule protects: its type and the route parameter holding its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTarget {
    pub entity_type: String,
    pub id_param: String,
}

impl EntityTarget {
    pub fn new(entity_type: impl Into<String>, id_param: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id_param: id_param.into(),
        }
    }

    /// `teamId` → type `team`, param `teamId`.
    pub fn from_param(param: &str) -> Option<Self> {
        let entity_type = param.strip_suffix("Id").filter(|t| !t.is_empty())?;
        Some(Self::new(entity_type, param))
    }
}

/// Entities implied by route parameters named `<type>Id`.
pub fn infer_entities<'a, I>(params: I) -> Vec<EntityRef>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    params
        .into_iter()
        .filter_map(|(name, value)| {
            let target = EntityTarget::from_param(name)?;
            Some(EntityRef::new(target.entity_type, value))
        })
        .collect()
}
