//! Flattening of composite entities down to their reference accessions.

use indexmap::IndexMap;

use crate::error::{ConvertError, Result};
use crate::model::{DbId, Entity, EntityGraph, ReferenceEntity, ID_PLACEHOLDER};

/// Leaf of a flattened entity: one database accession and how often it occurs.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceAccession {
    pub identifier: String,
    pub database: String,
    pub url: String,
    pub multiplicity: u32,
}

impl ReferenceAccession {
    /// `database:identifier`, as used in explanatory notes.
    pub fn label(&self) -> String {
        format!("{}:{}", self.database, self.identifier)
    }
}

pub struct EntityResolver<'a> {
    graph: &'a EntityGraph,
}

impl<'a> EntityResolver<'a> {
    pub fn new(graph: &'a EntityGraph) -> Self {
        Self { graph }
    }

    /// Depth-first flattening of `root`. Accessions are grouped by reference
    /// entity in first-visit order and their path multiplicities summed.
    pub fn flatten(&self, root: &Entity) -> Result<Vec<ReferenceAccession>> {
        let mut visited = Vec::new();
        let mut path = Vec::new();
        self.collect(root, 1, &mut path, &mut visited)?;

        let mut grouped: IndexMap<DbId, (&ReferenceEntity, u32)> = IndexMap::new();
        for (reference, count) in visited {
            grouped
                .entry(reference.db_id)
                .and_modify(|(_, total)| *total += count)
                .or_insert((reference, count));
        }

        grouped
            .into_values()
            .map(|(reference, multiplicity)| {
                let (database, url) = resolve_url(reference)?;
                Ok(ReferenceAccession {
                    identifier: reference.identifier.clone(),
                    database,
                    url,
                    multiplicity,
                })
            })
            .collect()
    }

    fn collect<'g>(
        &'g self,
        entity: &'g Entity,
        multiplier: u32,
        path: &mut Vec<DbId>,
        visited: &mut Vec<(&'g ReferenceEntity, u32)>,
    ) -> Result<()> {
        if path.contains(&entity.db_id) {
            return Err(ConvertError::integrity(
                entity.db_id,
                "cyclic composite structure",
            ));
        }
        // A composite may carry its own accession next to its children.
        if let Some(reference) = &entity.reference {
            visited.push((reference, multiplier));
        }
        if !entity.has_structure() {
            if entity.reference.is_none() {
                tracing::trace!(entity = entity.db_id, "no reference entity, skipped");
            }
            return Ok(());
        }

        path.push(entity.db_id);
        for child in entity.children() {
            let child_entity = self.graph.get(child.entity)?;
            let weight = multiplier.saturating_mul(child.stoichiometry.max(1));
            self.collect(child_entity, weight, path, visited)?;
        }
        path.pop();
        Ok(())
    }
}

/// Substitute the accession into its database's URL template.
pub fn resolve_url(reference: &ReferenceEntity) -> Result<(String, String)> {
    let database = reference.database.as_ref().ok_or_else(|| {
        ConvertError::integrity(reference.db_id, "reference entity has no reference database")
    })?;
    let template = database.url_template.as_deref().ok_or_else(|| {
        ConvertError::integrity(
            database.db_id,
            format!("reference database {} has no URL template", database.name),
        )
    })?;
    if !template.contains(ID_PLACEHOLDER) {
        return Err(ConvertError::integrity(
            database.db_id,
            format!("URL template of {} lacks {ID_PLACEHOLDER}", database.name),
        ));
    }
    Ok((
        database.name.clone(),
        template.replace(ID_PLACEHOLDER, &reference.identifier),
    ))
}
