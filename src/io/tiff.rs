//! GeoTIFF reading and writing.
//!
//! Georeferencing is read from `ModelPixelScale` + `ModelTiepoint` or from
//! `ModelTransformation`; the GeoKey directory and its parameter tags are
//! carried through unchanged. NoData follows the GDAL convention (ASCII tag
//! 42113).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use ndarray::{Array2, Zip};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::common::open_for_write;
use crate::error::RasterError;
use crate::raster::{ClassInfo, ClassRaster, GeoTransform, Raster, SpatialRef, CLASS_NODATA};

/// Decoded samples of one image, converted to `f64`, pixel-interleaved.
fn samples_f64(result: DecodingResult) -> Vec<f64> {
    match result {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
    }
}

/// (samples per pixel, index of the alpha sample) for the supported layouts.
fn layout(color: ColorType) -> Result<(usize, Option<usize>), RasterError> {
    match color {
        ColorType::Gray(_) | ColorType::Palette(_) => Ok((1, None)),
        ColorType::GrayA(_) => Ok((2, Some(1))),
        ColorType::RGB(_) => Ok((3, None)),
        ColorType::RGBA(_) => Ok((4, Some(3))),
        other => Err(RasterError::Unsupported(format!("{other:?}"))),
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>, RasterError> {
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited()))
}

fn read_transform<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform, RasterError> {
    let scale = decoder.find_tag(Tag::ModelPixelScaleTag)?.map(|v| v.into_f64_vec()).transpose()?;
    let tiepoint = decoder.find_tag(Tag::ModelTiepointTag)?.map(|v| v.into_f64_vec()).transpose()?;

    if let (Some(scale), Some(tie)) = (scale, tiepoint) {
        if scale.len() < 2 || tie.len() < 6 {
            return Err(RasterError::Georeference("truncated pixel scale or tiepoint".into()));
        }
        let (sx, sy) = (scale[0], scale[1]);
        return Ok(GeoTransform {
            origin_x: tie[3] - tie[0] * sx,
            origin_y: tie[4] + tie[1] * sy,
            cell_width: sx,
            cell_height: sy,
        });
    }

    if let Some(m) = decoder.find_tag(Tag::ModelTransformationTag)?.map(|v| v.into_f64_vec()).transpose()? {
        if m.len() < 8 {
            return Err(RasterError::Georeference("truncated model transformation".into()));
        }
        if m[1] != 0.0 || m[4] != 0.0 {
            return Err(RasterError::Georeference("rotated rasters are not supported".into()));
        }
        return Ok(GeoTransform { origin_x: m[3], origin_y: m[7], cell_width: m[0], cell_height: -m[5] });
    }

    Err(RasterError::Georeference("no model pixel scale / tiepoint or transformation tags".into()))
}

fn read_spatial_ref<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<SpatialRef, RasterError> {
    Ok(SpatialRef {
        geo_keys: decoder.find_tag(Tag::GeoKeyDirectoryTag)?.map(|v| v.into_u16_vec()).transpose()?,
        geo_doubles: decoder.find_tag(Tag::GeoDoubleParamsTag)?.map(|v| v.into_f64_vec()).transpose()?,
        geo_ascii: decoder.find_tag(Tag::GeoAsciiParamsTag)?.map(|v| v.into_string()).transpose()?,
    })
}

fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>, RasterError> {
    let text = decoder.find_tag(Tag::GdalNodata)?.map(|v| v.into_string()).transpose()?;
    Ok(text.and_then(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse().ok()))
}

/// Read a GeoTIFF into one `f64` band per colour sample.
///
/// Alpha samples are not kept as bands: a zero alpha marks the cell NoData.
/// Strips and tiles are decoded one at a time straight into the bands, so
/// peak memory is 8 bytes per sample plus one chunk; a 10 000 x 13 000 RGB
/// quadrangle still needs about 3 GB before resampling.
pub fn read_raster(path: &Path) -> Result<Raster, RasterError> {
    let mut decoder = open_decoder(path)?;
    let (width, height) = decoder.dimensions()?;
    let (channels, alpha) = layout(decoder.colortype()?)?;
    if decoder.find_tag_unsigned::<u16>(Tag::PlanarConfiguration)? == Some(2) {
        return Err(RasterError::Unsupported("planar sample layout".into()));
    }
    let transform = read_transform(&mut decoder)?;
    let spatial_ref = read_spatial_ref(&mut decoder)?;
    let nodata = read_nodata(&mut decoder)?;

    let (cols, rows) = (width as usize, height as usize);
    let mut bands = vec![Array2::<f64>::zeros((rows, cols)); channels];
    if rows > 0 && cols > 0 {
        let (chunk_w, chunk_h) = decoder.chunk_dimensions();
        let (chunk_w, chunk_h) = (chunk_w as usize, chunk_h as usize);
        if chunk_w == 0 || chunk_h == 0 {
            return Err(RasterError::Unsupported("zero-sized strips or tiles".into()));
        }
        let across = cols.div_ceil(chunk_w);
        for index in 0..across * rows.div_ceil(chunk_h) {
            let chunk = u32::try_from(index).map_err(|e| RasterError::Unsupported(e.to_string()))?;
            let (data_w, data_h) = decoder.chunk_data_dimensions(chunk);
            let (data_w, data_h) = (data_w as usize, data_h as usize);
            let samples = samples_f64(decoder.read_chunk(chunk)?);
            if samples.len() < data_w * data_h * channels {
                return Err(RasterError::Unsupported(format!(
                    "chunk {index}: expected {} samples, decoded {}", data_w * data_h * channels, samples.len()
                )));
            }

            let (x0, y0) = ((index % across) * chunk_w, (index / across) * chunk_h);
            for (i, pixel) in samples.chunks_exact(channels).take(data_w * data_h).enumerate() {
                let (r, c) = (y0 + i / data_w, x0 + i % data_w);
                if r < rows && c < cols {
                    for (band, &value) in bands.iter_mut().zip(pixel) {
                        band[[r, c]] = value;
                    }
                }
            }
        }
    }

    if let Some(alpha) = alpha {
        let opacity = bands.remove(alpha);
        for band in &mut bands {
            Zip::from(band).and(&opacity).for_each(|value, &a| {
                if a == 0.0 {
                    *value = f64::NAN;
                }
            });
        }
    }

    Ok(Raster { bands, transform, spatial_ref, nodata })
}

/// Read a single-band `u8` classified raster and its [`ClassInfo`].
pub fn read_class_raster(path: &Path) -> Result<ClassRaster, RasterError> {
    let mut decoder = open_decoder(path)?;
    let (width, height) = decoder.dimensions()?;
    match decoder.colortype()? {
        ColorType::Gray(8) => {}
        other => return Err(RasterError::Unsupported(format!("classified raster must be 8-bit gray, found {other:?}"))),
    }
    let transform = read_transform(&mut decoder)?;
    let spatial_ref = read_spatial_ref(&mut decoder)?;
    let info = decoder.find_tag(Tag::ImageDescription)?
        .and_then(|v| v.into_string().ok())
        .and_then(|s| serde_json::from_str::<ClassInfo>(s.trim_end_matches('\0')).ok());

    let DecodingResult::U8(cells) = decoder.read_image()? else {
        return Err(RasterError::Unsupported("classified raster is not u8".into()));
    };
    let classes = Array2::from_shape_vec((height as usize, width as usize), cells)
        .map_err(|e| RasterError::Unsupported(e.to_string()))?;

    Ok(ClassRaster { classes, transform, spatial_ref, info })
}

/// GeoTIFF tags shared by every raster we write.
fn write_geo_tags<W: std::io::Write + std::io::Seek, K: tiff::encoder::TiffKind>(
    dir: &mut tiff::encoder::DirectoryEncoder<'_, W, K>,
    transform: &GeoTransform,
    spatial_ref: &SpatialRef,
) -> tiff::TiffResult<()> {
    dir.write_tag(Tag::ModelPixelScaleTag, &[transform.cell_width, transform.cell_height, 0.0][..])?;
    dir.write_tag(Tag::ModelTiepointTag, &[0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0][..])?;
    if let Some(keys) = &spatial_ref.geo_keys {
        dir.write_tag(Tag::GeoKeyDirectoryTag, &keys[..])?;
    }
    if let Some(doubles) = &spatial_ref.geo_doubles {
        dir.write_tag(Tag::GeoDoubleParamsTag, &doubles[..])?;
    }
    if let Some(ascii) = &spatial_ref.geo_ascii {
        dir.write_tag(Tag::GeoAsciiParamsTag, ascii.as_str())?;
    }
    Ok(())
}

/// Write a classified raster (`u8`, NoData 255, [`ClassInfo`] as JSON description).
pub fn write_class_raster(path: &Path, raster: &ClassRaster) -> Result<()> {
    let (rows, cols) = raster.shape();
    let data: Vec<u8> = raster.classes.iter().copied().collect();
    let description = raster.info.as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("[io::tiff::write] Failed to serialize class info")?;

    let mut pending = open_for_write(path)?;
    {
        let mut encoder = TiffEncoder::new(&mut pending)
            .with_context(|| format!("[io::tiff::write] Failed to start TIFF {}", path.display()))?;
        let mut image = encoder.new_image::<colortype::Gray8>(cols as u32, rows as u32)
            .context("[io::tiff::write] Failed to create image")?;
        write_geo_tags(image.encoder(), &raster.transform, &raster.spatial_ref)
            .context("[io::tiff::write] Failed to write georeferencing")?;
        image.encoder().write_tag(Tag::GdalNodata, CLASS_NODATA.to_string().as_str())
            .context("[io::tiff::write] Failed to write NoData tag")?;
        if let Some(description) = &description {
            image.encoder().write_tag(Tag::ImageDescription, description.as_str())
                .context("[io::tiff::write] Failed to write description")?;
        }
        image.write_data(&data)
            .with_context(|| format!("[io::tiff::write] Failed to write cells of {}", path.display()))?;
    }
    pending.finish()
}

/// Write a 1-band (gray) or 3-band (RGB) raster with `f32` samples.
pub fn write_raster(path: &Path, raster: &Raster) -> Result<()> {
    let (rows, cols) = raster.shape();
    let interleaved: Vec<f32> = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (r, c)))
        .flat_map(|(r, c)| raster.bands.iter().map(move |b| b[[r, c]] as f32))
        .collect();

    let mut pending = open_for_write(path)?;
    {
        let mut encoder = TiffEncoder::new(&mut pending)
            .with_context(|| format!("[io::tiff::write] Failed to start TIFF {}", path.display()))?;
        macro_rules! write_image {
            ($color:ty) => {{
                let mut image = encoder.new_image::<$color>(cols as u32, rows as u32)
                    .context("[io::tiff::write] Failed to create image")?;
                write_geo_tags(image.encoder(), &raster.transform, &raster.spatial_ref)
                    .context("[io::tiff::write] Failed to write georeferencing")?;
                if let Some(nodata) = raster.nodata {
                    image.encoder().write_tag(Tag::GdalNodata, nodata.to_string().as_str())
                        .context("[io::tiff::write] Failed to write NoData tag")?;
                }
                image.write_data(&interleaved)
                    .with_context(|| format!("[io::tiff::write] Failed to write cells of {}", path.display()))?;
            }};
        }
        match raster.band_count() {
            1 => write_image!(colortype::Gray32Float),
            3 => write_image!(colortype::RGB32Float),
            n => anyhow::bail!("[io::tiff::write] Cannot write a {n}-band raster"),
        }
    }
    pending.finish()
}
