use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use structly::error::StructlyError;
use structly::{
    decode_to_json, encode_from_json, parse_schema, validate_data, Decoder, Schema, SchemaKind,
    Value,
};

#[derive(Parser)]
#[command(name = "structly")]
#[command(about = "Inspect, encode, decode and validate fixed-layout binary structs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the offset, size and alignment of every member of a schema
    Layout {
        /// JSON schema document
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Encode a JSON value to binary
    Encode {
        /// JSON schema document
        #[arg(short, long)]
        schema: PathBuf,

        /// JSON file holding the value to encode
        #[arg(short, long)]
        input: PathBuf,

        /// Output binary file (if omitted, prints hex to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a binary file to JSON (printed to stdout)
    Decode {
        /// JSON schema document
        #[arg(short, long)]
        schema: PathBuf,

        /// Input binary file
        #[arg(short, long)]
        input: PathBuf,

        /// Byte offset of the value inside the file
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Check a JSON value against a schema without encoding it
    Validate {
        /// JSON schema document
        #[arg(short, long)]
        schema: PathBuf,

        /// JSON file holding the value to check
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn load_schema(path: &Path) -> Result<Schema, StructlyError> {
    let text = fs::read_to_string(path).map_err(StructlyError::Io)?;
    let schema = parse_schema(&text)?;
    debug!(
        "Loaded {:?} schema from {} ({} bytes)",
        schema.tag(),
        path.display(),
        schema.byte_length()
    );
    Ok(schema)
}

fn print_layout(name: &str, schema: &Schema, byte_offset: usize, depth: usize) {
    println!(
        "{:>6}  {:>6}  {:>5}  {}{} {:?}",
        byte_offset,
        schema.byte_length(),
        schema.byte_alignment(),
        "  ".repeat(depth),
        name,
        schema.tag(),
    );

    match schema.kind() {
        SchemaKind::Array {
            element,
            length,
            stride,
        } => {
            for i in 0..*length {
                print_layout(&format!("[{}]", i), element, byte_offset + i * stride, depth + 1);
            }
        }
        SchemaKind::Tuple { fields } => {
            for (i, field) in fields.iter().enumerate() {
                print_layout(
                    &format!("{}", i),
                    &field.schema,
                    byte_offset + field.byte_offset,
                    depth + 1,
                );
            }
        }
        SchemaKind::Struct { fields } => {
            for field in fields {
                print_layout(
                    &field.name,
                    &field.schema,
                    byte_offset + field.byte_offset,
                    depth + 1,
                );
            }
        }
        SchemaKind::Bitfield { members, .. } => {
            let mut bit = 0;
            for member in members {
                println!(
                    "{:>6}  {:>6}  {:>5}  {}{} bits {}..{}",
                    byte_offset,
                    "",
                    "",
                    "  ".repeat(depth + 1),
                    member.name,
                    bit,
                    bit + member.bits
                );
                bit += member.bits;
            }
        }
        _ => {}
    }
}

fn main() -> Result<(), StructlyError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Layout { schema } => {
            let schema = load_schema(schema)?;
            println!("{:>6}  {:>6}  {:>5}  member", "offset", "size", "align");
            print_layout("<root>", &schema, 0, 0);
            Ok(())
        }

        Commands::Encode {
            schema,
            input,
            output,
        } => {
            let schema = load_schema(schema)?;
            let text = fs::read_to_string(input).map_err(StructlyError::Io)?;
            let bytes = encode_from_json(&schema, &text)?;
            if let Some(out_path) = output {
                fs::write(out_path, &bytes).map_err(StructlyError::Io)?;
                info!("Wrote {} bytes to {}", bytes.len(), out_path.display());
                println!("Encoded {} → {}", input.display(), out_path.display());
            } else {
                let hex: Vec<String> = bytes.iter().map(|byte| format!("{:02x}", byte)).collect();
                println!("{}", hex.join(" "));
            }
            Ok(())
        }

        Commands::Decode {
            schema,
            input,
            offset,
        } => {
            let schema = load_schema(schema)?;
            let data = fs::read(input).map_err(StructlyError::Io)?;
            let json = if *offset == 0 {
                decode_to_json(&schema, &data)?
            } else {
                let value = Decoder::new(&schema)?.decode_at(&data, *offset)?;
                serde_json::to_string_pretty(&value.to_json())?
            };
            println!("{}", json);
            Ok(())
        }

        Commands::Validate { schema, input } => {
            let schema = load_schema(schema)?;
            let text = fs::read_to_string(input).map_err(StructlyError::Io)?;
            let json: serde_json::Value = serde_json::from_str(&text)?;
            let value = Value::from_json_with_schema(&json, &schema)?;
            match validate_data(&schema, &value)? {
                None => {
                    println!("{} matches the schema", input.display());
                    Ok(())
                }
                Some(mismatch) => Err(StructlyError::Mismatch(mismatch)),
            }
        }
    }
}
