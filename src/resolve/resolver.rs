//! Lookup resolution
//!
//! For every parent entity and every lookup attached to the parent query, a
//! child query is derived and run through the full pipeline again. Entities
//! are processed through an order-preserving buffered stream, so results
//! come back in parent order whatever the concurrency.

use super::key::{extra_parameters, key_values};
use super::types::{ResolvedLookup, ResolvedRow, ResolvedSet};
use crate::error::Result;
use crate::parse::Node;
use crate::query::{LookupQuery, Query, LOOKUP_QUERY_LIMIT};
use crate::registry::{ConnectorCatalog, EndpointDescriptor};
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, warn};

/// Default number of parent entities resolved concurrently
pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 4;

/// Runs a query through fetch, parse and lookup resolution
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Run `query`; `remaining` is how many more lookup levels may be resolved
    async fn run(&self, query: Query, remaining: usize) -> Result<ResolvedSet>;
}

/// Resolves the lookups of one query's entities
pub struct LookupResolver<'a> {
    runner: &'a dyn QueryRunner,
    catalog: &'a ConnectorCatalog,
    concurrency: usize,
}

impl<'a> LookupResolver<'a> {
    pub fn new(runner: &'a dyn QueryRunner, catalog: &'a ConnectorCatalog) -> Self {
        Self {
            runner,
            catalog,
            concurrency: DEFAULT_LOOKUP_CONCURRENCY,
        }
    }

    /// Set how many parent entities are resolved at once
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Resolve the lookups of `parent` for every entity
    ///
    /// Entities for which any lookup yields no rows are dropped.
    pub async fn resolve(
        &self,
        parent: &Query,
        entities: Vec<Node>,
        remaining: usize,
    ) -> Result<Vec<ResolvedRow>> {
        if parent.lookups().is_empty() {
            return Ok(entities.into_iter().map(ResolvedRow::new).collect());
        }
        if remaining == 0 {
            warn!(
                endpoint = %parent.endpoint(),
                limit = LOOKUP_QUERY_LIMIT,
                "Lookup nesting limit reached, ignoring lookups"
            );
            return Ok(entities.into_iter().map(ResolvedRow::new).collect());
        }

        let rows: Vec<Option<ResolvedRow>> = stream::iter(
            entities
                .into_iter()
                .map(|entity| self.resolve_entity(parent, entity, remaining)),
        )
        .buffered(self.concurrency)
        .try_collect()
        .await?;

        Ok(rows.into_iter().flatten().collect())
    }

    async fn resolve_entity(
        &self,
        parent: &Query,
        entity: Node,
        remaining: usize,
    ) -> Result<Option<ResolvedRow>> {
        let mut children = Vec::with_capacity(parent.lookups().len());

        for lookup in parent.lookups() {
            let descriptor = &lookup.descriptor;
            let ids = key_values(&entity, descriptor, parent)?;
            if ids.is_empty() {
                debug!(
                    endpoint = %parent.endpoint(),
                    lookup = %descriptor.endpoint,
                    "No lookup key, dropping entity"
                );
                return Ok(None);
            }

            let target = self.catalog.endpoint(&descriptor.endpoint)?;
            let extras = extra_parameters(&entity, descriptor, parent)?;

            let mut result: Option<ResolvedSet> = None;
            for id in &ids {
                let child = child_query(target, lookup, parent, id, &extras);
                let set = self.runner.run(child, remaining - 1).await?;
                result = Some(match result.take() {
                    Some(mut merged) => {
                        merged.merge(set);
                        merged
                    }
                    None => set,
                });
            }

            match result {
                Some(result) if !result.is_empty() => children.push(ResolvedLookup {
                    prefix: descriptor.column_prefix().to_string(),
                    result,
                }),
                _ => {
                    debug!(
                        endpoint = %parent.endpoint(),
                        lookup = %descriptor.endpoint,
                        "Lookup returned no rows, dropping entity"
                    );
                    return Ok(None);
                }
            }
        }

        Ok(Some(ResolvedRow { entity, children }))
    }
}

/// Derive the query a lookup runs for one id
///
/// Parent parameters come first when inherited; the id and the extra
/// parameters are set on top.
pub fn child_query(
    target: &EndpointDescriptor,
    lookup: &LookupQuery,
    parent: &Query,
    id: &str,
    extras: &[(String, String)],
) -> Query {
    let descriptor = &lookup.descriptor;
    let mut child = Query::for_endpoint(target).with_leaf_to_null(parent.leaf_to_null());

    if descriptor.inherit_parameters {
        child = child
            .with_parameters(parent.parameters().clone())
            .with_additional_parameters(parent.additional_parameters().clone());
    }

    child = child.with_parameter(descriptor.parameter_name.as_str(), id);
    for (name, value) in extras {
        child = child.with_parameter(name.as_str(), value.as_str());
    }

    if descriptor.json_path.is_some() {
        child = child.with_json_path(descriptor.json_path.clone());
    }

    child
        .with_expand_arrays(descriptor.expand_arrays)
        .with_top_level_only(descriptor.top_level_only)
        .with_lookups(lookup.lookups.clone())
}
