use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::backend::{RawTexture, RawTextureView};
use crate::buffer::MemoryLocation;
use crate::device::Device;
use crate::error::RhiError;
use crate::format::{PixelFormat, SampleCount};

// texture type is associated with texture view type.
// use this for both types.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureType {
    Tex1d,
    Tex1dArray,
    Tex2d,
    Tex2dArray,
    Tex3d,
    Cube,
    CubeArray,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureTiling {
    Optimal,
    Linear,
}

bitflags::bitflags! {
    #[derive(Serialize, Deserialize)]
    pub struct TextureUsageFlags: u32 {
        const TRANSFER_SRC  = 0b0000_0001;
        const TRANSFER_DST  = 0b0000_0010;
        const SAMPLED       = 0b0000_0100;
        const STORAGE       = 0b0000_1000;
        const COLOR         = 0b0001_0000;
        const DEPTH_STENCIL = 0b0010_0000;
        const TRANSIENT     = 0b0100_0000;
        const INPUT         = 0b1000_0000;
    }
}

bitflags::bitflags! {
    #[derive(Serialize, Deserialize)]
    pub struct TextureCreateFlags: u32 {
        const CUBE_COMPATIBLE = 0b1;
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureDesc {
    pub ty: TextureType,
    pub format: PixelFormat,
    pub extent: [u32; 3],
    pub mip_levels: u16,
    pub array_layers: u32,
    pub samples: SampleCount,
    pub tiling: TextureTiling,
    pub usage: TextureUsageFlags,
    pub flags: TextureCreateFlags,
    pub memory: MemoryLocation,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            ty: TextureType::Tex2d,
            format: PixelFormat::Unknown,
            extent: [0, 0, 0],
            mip_levels: 1,
            array_layers: 1,
            samples: SampleCount::X1,
            tiling: TextureTiling::Optimal,
            usage: TextureUsageFlags::empty(),
            flags: TextureCreateFlags::empty(),
            memory: MemoryLocation::GpuOnly,
        }
    }
}

impl TextureDesc {
    pub fn new_1d(extent: u32, format: PixelFormat) -> Self {
        Self {
            ty: TextureType::Tex1d,
            format,
            extent: [extent, 1, 1],
            ..Default::default()
        }
    }

    pub fn new_2d(extent: [u32; 2], format: PixelFormat) -> Self {
        Self {
            ty: TextureType::Tex2d,
            format,
            extent: [extent[0], extent[1], 1],
            ..Default::default()
        }
    }

    pub fn new_2d_array(extent: [u32; 2], format: PixelFormat, array_layers: u32) -> Self {
        Self::new_2d(extent, format)
            .array_layers(array_layers)
            .ty(TextureType::Tex2dArray)
    }

    pub fn new_3d(extent: [u32; 3], format: PixelFormat) -> Self {
        Self {
            ty: TextureType::Tex3d,
            format,
            extent,
            ..Default::default()
        }
    }

    pub fn new_cube(extent: u32, format: PixelFormat) -> Self {
        Self {
            ty: TextureType::Cube,
            format,
            extent: [extent, extent, 1],
            ..Default::default()
        }
        .array_layers(6)
        .create_flags(TextureCreateFlags::CUBE_COMPATIBLE)
    }

    #[inline]
    pub fn ty(mut self, ty: TextureType) -> Self {
        self.ty = ty;
        self
    }

    #[inline]
    pub fn usage_flags(mut self, usage: TextureUsageFlags) -> Self {
        self.usage = usage;
        self
    }

    #[inline]
    pub fn create_flags(mut self, flags: TextureCreateFlags) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn array_layers(mut self, layers: u32) -> Self {
        self.array_layers = layers;
        self
    }

    #[inline]
    pub fn mip_levels(mut self, levels: u16) -> Self {
        self.mip_levels = levels;
        self
    }

    #[inline]
    pub fn extent_2d(&self) -> [u32; 2] {
        [self.extent[0], self.extent[1]]
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Builder)]
#[builder(pattern = "owned", derive(Clone))]
pub struct TextureViewDesc {
    /// If this is None, infer from the texture type
    #[builder(setter(strip_option), default)]
    pub view_type: Option<TextureType>,
    /// If this is None, use the texture's own format
    #[builder(setter(strip_option), default)]
    pub format: Option<PixelFormat>,
    #[builder(default = "0")]
    pub base_mip_level: u32,
    #[builder(default = "None")]
    pub level_count: Option<u32>,
}

impl TextureViewDesc {
    pub fn builder() -> TextureViewDescBuilder {
        Default::default()
    }
}

impl Default for TextureViewDesc {
    fn default() -> Self {
        TextureViewDescBuilder::default().build().unwrap()
    }
}

pub struct Texture {
    pub raw: RawTexture,
    pub desc: TextureDesc,
    pub views: Mutex<HashMap<TextureViewDesc, RawTextureView>>,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("raw", &self.raw)
            .field("desc", &self.desc)
            .finish()
    }
}

impl Texture {
    /// Get or create a view of this texture.
    pub fn view(&self, device: &Device, view_desc: &TextureViewDesc) -> anyhow::Result<RawTextureView, RhiError> {
        let mut views = self.views.lock();

        if let Some(view) = views.get(view_desc) {
            Ok(*view)
        } else {
            let view = device.backend().create_texture_view(self.raw, view_desc)?;
            Ok(*views.entry(*view_desc).or_insert(view))
        }
    }
}

// implement texture associated functions for device
impl Device {
    pub fn create_texture(&self, desc: TextureDesc, name: &str) -> anyhow::Result<Texture, RhiError> {
        let raw = self.backend().create_texture(&desc, name)?;

        Ok(Texture {
            raw,
            desc,
            views: Mutex::new(HashMap::new()),
        })
    }

    pub fn destroy_texture(&self, texture: Texture) {
        // views are owned by the texture and die with it
        self.backend().destroy_texture(texture.raw);
    }
}
