use structly_compiler::{Decoder, DecoderOptions, Encoder, EncoderOptions};
use structly_schema::{error::Result, Schema, Value};

/// An encoder and a decoder for the same schema.
#[derive(Debug, Clone)]
pub struct Converter {
    encoder: Encoder,
    decoder: Decoder,
}

impl Converter {
    pub fn new(schema: &Schema) -> Result<Converter> {
        Converter::with_options(schema, EncoderOptions::default(), DecoderOptions::default())
    }

    pub fn with_options(
        schema: &Schema,
        encoder: EncoderOptions,
        decoder: DecoderOptions,
    ) -> Result<Converter> {
        Ok(Converter {
            encoder: Encoder::with_options(schema, encoder)?,
            decoder: Decoder::with_options(schema, decoder)?,
        })
    }

    pub fn schema(&self) -> &Schema {
        self.encoder.schema()
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        self.encoder.encode(value)
    }

    pub fn encode_into(&self, value: &Value, dest: &mut [u8], offset: usize) -> Result<()> {
        self.encoder.encode_into(value, dest, offset)
    }

    pub fn decode(&self, source: &[u8]) -> Result<Value> {
        self.decoder.decode(source)
    }

    pub fn decode_at(&self, source: &[u8], offset: usize) -> Result<Value> {
        self.decoder.decode_at(source, offset)
    }

    pub fn decode_into(&self, source: &[u8], target: &mut Value, offset: usize) -> Result<()> {
        self.decoder.decode_into(source, target, offset)
    }
}
