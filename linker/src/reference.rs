use std::borrow::Borrow;

use cfgviz::entity::Entity;
use cfgviz::template::Pattern;
use tracing::trace;

/// Scan an entity's own lines for references and append the ids they name.
///
/// Link templates are matched against each line with its indentation removed,
/// so `peer {{name}}` finds ` peer router2` inside a block body. Returns the
/// number of links that were new to the entity.
pub fn extract<P: Borrow<Pattern>>(entity: &mut Entity, links: &[P]) -> usize {
    let mut added = 0;
    for pattern in links {
        let pattern: &Pattern = pattern.borrow();
        for line in &entity.text {
            let Some(name) = pattern.capture_name(line.trim_start()) else {
                continue;
            };
            let id = Entity::id_for(pattern.type_label(), name);
            if entity.links.contains(&id) {
                continue;
            }
            trace!(from = %entity.id, to = %id, "found link");
            entity.links.insert(id);
            added += 1;
        }
    }
    added
}
