//! Direct3D 11 device context backend

use super::{DeviceContext, Mapped, PixelFormat, TextureDesc};
use anyhow::anyhow;
use windows::Win32::Graphics::{Direct3D11::*, Dxgi::Common::*};

/// Immediate context of a D3D11 device. The COM references keep the device
/// alive; nothing here releases resources beyond dropping its own references.
#[derive(Clone)]
pub struct D3D11Context {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
}

unsafe impl Send for D3D11Context {}

impl D3D11Context {
    pub fn new(device: ID3D11Device, context: ID3D11DeviceContext) -> Self {
        Self { device, context }
    }

    pub fn device(&self) -> &ID3D11Device {
        &self.device
    }

    /// Create a CPU-readable staging texture able to receive `rendered`.
    ///
    /// For texture arrays the staging texture holds all slots side by side,
    /// so it is `array_size` times wider than one slot.
    pub fn create_staging_for(
        &self,
        rendered: &ID3D11Texture2D,
    ) -> Result<ID3D11Texture2D, anyhow::Error> {
        unsafe {
            let mut texture_desc = D3D11_TEXTURE2D_DESC::default();
            rendered.GetDesc(&mut texture_desc);

            if texture_desc.ArraySize == 2 {
                texture_desc.Width *= 2;
            }
            texture_desc.MipLevels = 1;
            texture_desc.ArraySize = 1;
            texture_desc.SampleDesc.Count = 1;
            texture_desc.SampleDesc.Quality = 0;
            texture_desc.Usage = D3D11_USAGE_STAGING;
            texture_desc.CPUAccessFlags = D3D11_CPU_ACCESS_READ.0 as u32;
            texture_desc.BindFlags = D3D11_BIND_FLAG::default().0 as u32;
            texture_desc.MiscFlags = D3D11_RESOURCE_MISC_FLAG::default().0 as u32;

            let mut staging_texture = None;
            self.device
                .CreateTexture2D(&texture_desc, None, Some(&mut staging_texture))?;
            staging_texture.ok_or_else(|| anyhow!("CreateTexture2D returned no staging texture"))
        }
    }
}

/// Read the description of a rendered texture in packer terms.
pub fn texture_desc(texture: &ID3D11Texture2D) -> TextureDesc {
    let mut desc = D3D11_TEXTURE2D_DESC::default();
    unsafe { texture.GetDesc(&mut desc) };
    TextureDesc {
        width: desc.Width,
        height: desc.Height,
        array_size: desc.ArraySize,
        mip_levels: desc.MipLevels,
        format: desc.Format.into(),
    }
}

impl From<DXGI_FORMAT> for PixelFormat {
    fn from(format: DXGI_FORMAT) -> Self {
        match format {
            DXGI_FORMAT_R8G8B8A8_UNORM => PixelFormat::R8G8B8A8Unorm,
            DXGI_FORMAT_R8G8B8A8_TYPELESS => PixelFormat::R8G8B8A8Typeless,
            DXGI_FORMAT_B8G8R8A8_UNORM => PixelFormat::B8G8R8A8Unorm,
            DXGI_FORMAT_R16_TYPELESS => PixelFormat::R16Typeless,
            DXGI_FORMAT_R16_UNORM => PixelFormat::R16Unorm,
            DXGI_FORMAT_D16_UNORM => PixelFormat::D16Unorm,
            other => PixelFormat::Other(other.0 as u32),
        }
    }
}

impl DeviceContext for D3D11Context {
    type Texture = ID3D11Texture2D;
    type Mapping<'a> = &'a [u8];

    fn copy_subresource_region(
        &self,
        dst: &ID3D11Texture2D,
        dst_x: u32,
        src: &ID3D11Texture2D,
        src_subresource: u32,
    ) {
        unsafe {
            self.context
                .CopySubresourceRegion(dst, 0, dst_x, 0, 0, src, src_subresource, None);
        }
    }

    fn map_read<'a>(
        &'a self,
        texture: &'a ID3D11Texture2D,
    ) -> anyhow::Result<Mapped<&'a [u8]>> {
        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        unsafe {
            self.context
                .Map(texture, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
                .map_err(|e| anyhow!("Map failed: {e:?}"))?;
        }

        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };

        let row_pitch = mapped.RowPitch as usize;
        // SAFETY: the driver guarantees RowPitch * Height readable bytes at pData
        // until Unmap, and MappedTexture drops this slice before unmapping.
        let data = unsafe {
            std::slice::from_raw_parts(
                mapped.pData as *const u8,
                row_pitch * desc.Height as usize,
            )
        };

        Ok(Mapped { data, row_pitch })
    }

    fn unmap(&self, texture: &ID3D11Texture2D) {
        unsafe {
            self.context.Unmap(texture, 0);
        }
    }
}
