use argh::FromArgs;
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use qoi::{Channels, Colorspace, Header, QoiDecodeContext, QoiImage};
use std::{fs::File, io::BufReader, str::FromStr};

/// QOI cli encoder and decoder.
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Encode(Encode),
    Decode(Decode),
    Info(Info),
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Png,
    Jpg,
    Bmp,
}

impl Format {
    fn image_format(self) -> ImageFormat {
        match self {
            Format::Png => ImageFormat::Png,
            Format::Jpg => ImageFormat::Jpeg,
            Format::Bmp => ImageFormat::Bmp,
        }
    }
}

impl FromStr for Format {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(format) = s.eq_ignore_ascii_case("png").then_some(Format::Png)
               .or_else(|| s.eq_ignore_ascii_case("jpg").then_some(Format::Jpg))
               .or_else(|| s.eq_ignore_ascii_case("jpeg").then_some(Format::Jpg))
               .or_else(|| s.eq_ignore_ascii_case("bmp").then_some(Format::Bmp))
        else { return Err("invalid format, expected png, jpg or bmp"); };

        Ok(format)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let Cli { command } = argh::from_env();

    match command {
        Command::Encode(options) => encode(options),
        Command::Decode(options) => decode(options),
        Command::Info(options) => info(options),
    }
}

/// Encodes an image as QOI.
#[derive(FromArgs)]
#[argh(subcommand, name = "encode")]
struct Encode {
    /// input format, optional (png, jpg, bmp). Guessed from the file contents if missing.
    #[argh(option)]
    format: Option<Format>,

    /// mark all channels as linear instead of sRGB
    #[argh(switch)]
    linear: bool,

    /// the input file
    #[argh(positional)]
    input: String,
    /// the output file
    #[argh(positional)]
    output: String,
}

fn encode(options: Encode) -> Result<(), Box<dyn std::error::Error>> {
    let Encode {
        format,
        linear,
        input,
        output,
    } = options;

    let image = match format {
        Some(format) => image::io::Reader::with_format(
            BufReader::new(File::open(&input)?),
            format.image_format(),
        )
        .decode()?,
        None => image::io::Reader::open(&input)?
            .with_guessed_format()?
            .decode()?,
    };

    let width = image.width();
    let height = image.height();
    let colorspace = if linear {
        Colorspace::Linear
    } else {
        Colorspace::Srgb
    };

    let (channels, pixels) = if image.color().has_alpha() {
        (Channels::Rgba, image.into_rgba8().into_raw())
    } else {
        (Channels::Rgb, image.into_rgb8().into_raw())
    };

    println!("Encoding {width}x{height} image with {channels:?} channels");

    let image = QoiImage::new(pixels, width, height, channels, colorspace)?;
    image.save(&output)?;

    let written = std::fs::metadata(&output)?.len();
    println!(
        "Written {written} bytes to `{output}` ({:.1}% of raw size)",
        written as f64 * 100.0 / image.pixels().len() as f64
    );

    Ok(())
}

/// Decodes a QOI image.
#[derive(FromArgs)]
#[argh(subcommand, name = "decode")]
struct Decode {
    /// output format (png, jpg, bmp)
    #[argh(option)]
    format: Format,

    /// fail if the stream doesn't end with the end marker
    #[argh(switch)]
    strict: bool,

    /// the input file
    #[argh(positional)]
    input: String,
    /// the output file
    #[argh(positional)]
    output: String,
}

fn decode(options: Decode) -> Result<(), Box<dyn std::error::Error>> {
    let Decode {
        format,
        strict,
        input,
        output,
    } = options;

    let qoi_input = std::fs::read(&input)?;

    println!("Decoding `{input}`");

    // jpeg has no alpha channel
    let channels = match format {
        Format::Jpg => Some(Channels::Rgb),
        Format::Png | Format::Bmp => None,
    };

    let mut pixels = Vec::new();
    let header = QoiDecodeContext::new()
        .strict_end_marker(strict)
        .decode_to_vec(&qoi_input, channels, &mut pixels)?;
    let Header { width, height, .. } = header;

    let image = match channels.unwrap_or(header.channels) {
        Channels::Rgb => DynamicImage::ImageRgb8(
            RgbImage::from_raw(width, height, pixels).ok_or("failed to create image")?,
        ),
        Channels::Rgba => DynamicImage::ImageRgba8(
            RgbaImage::from_raw(width, height, pixels).ok_or("failed to create image")?,
        ),
    };
    image.save_with_format(&output, format.image_format())?;

    println!("Written {width}x{height} image to `{output}`");

    Ok(())
}

/// Prints the header of a QOI image.
#[derive(FromArgs)]
#[argh(subcommand, name = "info")]
struct Info {
    /// the input file
    #[argh(positional)]
    input: String,
}

fn info(options: Info) -> Result<(), Box<dyn std::error::Error>> {
    let Info { input } = options;

    let data = std::fs::read(&input)?;
    let Header {
        width,
        height,
        channels,
        colorspace,
    } = Header::parse(&data)?;

    println!("`{input}`: {} bytes", data.len());
    println!("  dimensions: {width}x{height}");
    println!("  channels:   {} ({channels:?})", channels.bytes_per_pixel());
    println!("  colorspace: {colorspace:?}");

    Ok(())
}
