use kestrel_rhi::{Buffer, BufferDesc, Texture, TextureDesc};

use super::graph_resource::GraphResourceDesc;

/// Used to convince the compiler two types are the same.
pub trait TypeEqualTo {
    type Other;

    fn same(v: Self) -> Self::Other;
}

impl<T: Sized> TypeEqualTo for T {
    type Other = T;

    fn same(v: Self) -> Self::Other {
        v
    }
}

/// Any RHI resource the graph can hold.
pub trait Resource {
    type Desc: ResourceDesc;
}

impl Resource for Buffer {
    type Desc = BufferDesc;
}

impl Resource for Texture {
    type Desc = TextureDesc;
}

/// Any RHI resource description the graph can hold.
pub trait ResourceDesc: Clone + Into<GraphResourceDesc> + std::fmt::Debug {
    type Resource: Resource;
}

impl ResourceDesc for BufferDesc {
    type Resource = Buffer;
}

impl ResourceDesc for TextureDesc {
    type Resource = Texture;
}

impl From<BufferDesc> for GraphResourceDesc {
    fn from(desc: BufferDesc) -> Self {
        GraphResourceDesc::Buffer(desc)
    }
}

impl From<TextureDesc> for GraphResourceDesc {
    fn from(desc: TextureDesc) -> Self {
        GraphResourceDesc::Texture(desc)
    }
}

/// Shader Resource View.
pub struct Srv;
/// Unordered Access View.
pub struct Uav;
/// Render Target.
pub struct Rt;

/// Compile-time marker for the way a pass views a resource.
pub trait ResourceView {
    const IS_WRITABLE: bool;
}

impl ResourceView for Srv {
    const IS_WRITABLE: bool = false;
}

impl ResourceView for Uav {
    const IS_WRITABLE: bool = true;
}

impl ResourceView for Rt {
    const IS_WRITABLE: bool = true;
}
