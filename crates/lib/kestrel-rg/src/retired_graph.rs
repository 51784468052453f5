use std::collections::HashMap;

use kestrel_rhi::AccessState;

use crate::compiled_graph::{GraphPreparedResource, RegisteredResource, RetireClass};
use crate::transient_resource_cache::TransientResourceCache;

/// A render graph after execution, holding only the compiled resources that
/// still need to leave the frame.
pub(crate) struct RetiredRenderGraph {
    pub(crate) registered_resources: Vec<RegisteredResource>,
}

impl RetiredRenderGraph {
    /// Retire every compiled resource.
    ///
    /// Transient resources go back into the cache, named resources record
    /// their final access state under their name, imported resources write
    /// the final access back to the caller.
    pub fn retire(
        self,
        cache: &mut TransientResourceCache,
        exported_access: &mut HashMap<String, AccessState>,
    ) {
        for registered in self.registered_resources {
            let final_access = registered.get_current_access();

            match registered.retire {
                RetireClass::Transient => match registered.resource {
                    GraphPreparedResource::CreatedBuffer(buffer) => {
                        cache.restore_buffer(buffer);
                    }
                    GraphPreparedResource::CreatedTexture(texture) => {
                        cache.restore_texture(texture);
                    }
                    _ => unreachable!("Transient retirement on a non-created resource!"),
                },
                RetireClass::Named(name) => {
                    exported_access.insert(name, final_access);
                }
                RetireClass::Imported(access) => {
                    access.set(final_access);
                }
                RetireClass::Skip => {}
            }
        }
    }
}
