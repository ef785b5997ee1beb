//! `AudioAssembler` (`spec.md` §4.5): concatenates WAV byte-arrays produced
//! by the same synth model/sample-rate into one payload.

use crate::error::JobError;
use std::io::Cursor;

/// Concatenates `chunks` into a single WAV payload. The single-chunk case
/// is a pass-through (`spec.md` §4.5) — no re-encode, so a one-chunk job
/// never pays the assembly cost or risks a format mismatch.
pub fn concat(chunks: Vec<Vec<u8>>) -> Result<Vec<u8>, JobError> {
    if chunks.is_empty() {
        return Err(JobError::AssembleFailed("no audio chunks to assemble".to_string()));
    }
    if chunks.len() == 1 {
        return Ok(chunks.into_iter().next().unwrap());
    }

    let mut spec: Option<hound::WavSpec> = None;
    let mut samples: Vec<i32> = Vec::new();

    for (index, chunk) in chunks.into_iter().enumerate() {
        let reader = hound::WavReader::new(Cursor::new(chunk))
            .map_err(|e| JobError::AssembleFailed(format!("chunk {index}: failed to parse wav: {e}")))?;
        let chunk_spec = reader.spec();
        match &spec {
            None => spec = Some(chunk_spec),
            Some(existing) if *existing != chunk_spec => {
                return Err(JobError::AssembleFailed(format!(
                    "chunk {index} has mismatched wav format {chunk_spec:?}, expected {existing:?}"
                )));
            }
            _ => {}
        }

        for sample in reader.into_samples::<i32>() {
            samples.push(sample.map_err(|e| {
                JobError::AssembleFailed(format!("chunk {index}: failed to decode samples: {e}"))
            })?);
        }
    }

    let spec = spec.expect("at least one chunk was processed");
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buffer, spec)
            .map_err(|e| JobError::AssembleFailed(format!("failed to open wav writer: {e}")))?;
        for sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| JobError::AssembleFailed(format!("failed to write sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| JobError::AssembleFailed(format!("failed to finalize wav: {e}")))?;
    }

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_wav(sample_value: i16, num_samples: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut buffer, spec).unwrap();
            for _ in 0..num_samples {
                writer.write_sample(sample_value).unwrap();
            }
            writer.finalize().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn single_chunk_passes_through_unchanged() {
        let wav = make_wav(100, 10);
        let result = concat(vec![wav.clone()]).unwrap();
        assert_eq!(result, wav);
    }

    #[test]
    fn concatenation_duration_equals_sum_of_inputs() {
        let a = make_wav(50, 100);
        let b = make_wav(75, 200);
        let result = concat(vec![a, b]).unwrap();
        let reader = hound::WavReader::new(Cursor::new(result)).unwrap();
        assert_eq!(reader.duration(), 300);
    }

    #[test]
    fn empty_chunk_list_fails() {
        assert!(concat(vec![]).is_err());
    }

    #[test]
    fn mismatched_formats_fail() {
        let a = make_wav(1, 10);
        let mut b_spec_buf = Cursor::new(Vec::new());
        {
            let spec = hound::WavSpec {
                channels: 2,
                sample_rate: 44_100,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut writer = hound::WavWriter::new(&mut b_spec_buf, spec).unwrap();
            writer.write_sample(1i16).unwrap();
            writer.write_sample(1i16).unwrap();
            writer.finalize().unwrap();
        }
        assert!(concat(vec![a, b_spec_buf.into_inner()]).is_err());
    }
}
