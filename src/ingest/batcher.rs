use crate::errors::IngestResult;
use crate::ingest::extractor::ElementTransformer;
use crate::ingest::xml_stream::RecordStream;
use crate::models::Batch;
use std::io::BufRead;
use tracing::info;

/// Groups streamed records into batches of `batch_size`.
///
/// Every batch except possibly the last is full; the last one holds whatever
/// remained. A document without matching records produces no batches at all.
/// The first error (parse failure or transform failure) is yielded once and
/// ends the iteration; the records buffered for that batch are dropped.
pub struct Batches<'t, R: BufRead> {
    stream: RecordStream<R>,
    transform: Box<dyn ElementTransformer + 't>,
    batch_size: usize,
    batches: usize,
    records: usize,
    done: bool,
}

impl<'t, R: BufRead> Batches<'t, R> {
    /// `batch_size` must be at least 1; it is clamped otherwise.
    pub fn new(
        stream: RecordStream<R>,
        batch_size: usize,
        transform: Box<dyn ElementTransformer + 't>,
    ) -> Self {
        Self {
            stream,
            transform,
            batch_size: batch_size.max(1),
            batches: 0,
            records: 0,
            done: false,
        }
    }

    /// Records handed out so far across all batches.
    pub fn records_emitted(&self) -> usize {
        self.records
    }
}

impl<R: BufRead> Iterator for Batches<'_, R> {
    type Item = IngestResult<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            let element = match self.stream.next_element() {
                Ok(Some(element)) => element,
                Ok(None) => {
                    self.done = true;
                    break;
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };
            match self.transform.transform(element) {
                Ok(record) => batch.push(record),
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }

        if batch.is_empty() {
            return None;
        }

        self.batches += 1;
        self.records += batch.len();
        info!(
            batch = self.batches,
            batch_records = batch.len(),
            total_records = self.records,
            final_batch = self.done,
            "Processing batch"
        );
        Some(Ok(batch))
    }
}

impl<R: BufRead> std::iter::FusedIterator for Batches<'_, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IngestError;
    use crate::ingest::extractor::RecordExtractor;
    use crate::models::{Element, Record};
    use std::io::Cursor;

    fn items(n: usize) -> String {
        let mut xml = String::from("<catalog>");
        for i in 0..n {
            xml.push_str(&format!("<item id=\"{i}\"><name>n{i}</name></item>"));
        }
        xml.push_str("</catalog>");
        xml
    }

    fn batches(xml: &str, batch_size: usize) -> Batches<'static, Cursor<Vec<u8>>> {
        let stream = RecordStream::new(Cursor::new(xml.as_bytes().to_vec()), "item");
        Batches::new(stream, batch_size, Box::new(RecordExtractor::default()))
    }

    #[test]
    fn five_records_in_batches_of_two() {
        let sizes: Vec<usize> = batches(&items(5), 2)
            .map(|b| b.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_batch() {
        let sizes: Vec<usize> = batches(&items(4), 2)
            .map(|b| b.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![2, 2]);
    }

    #[test]
    fn zero_records_yield_zero_batches() {
        assert_eq!(batches("<catalog/>", 3).count(), 0);
    }

    #[test]
    fn batch_count_is_ceiling_for_many_sizes() {
        for n in [1usize, 2, 7, 10] {
            for size in 1..=12 {
                let count = batches(&items(n), size).count();
                assert_eq!(count, n.div_ceil(size), "n={n} size={size}");
            }
        }
    }

    #[test]
    fn batching_preserves_record_sequence() {
        let xml = items(7);
        let reference: Vec<Record> = batches(&xml, 1).flat_map(|b| b.unwrap()).collect();
        for size in 1..=8 {
            let flattened: Vec<Record> = batches(&xml, size).flat_map(|b| b.unwrap()).collect();
            assert_eq!(flattened, reference, "batch size {size}");
        }
        assert_eq!(reference[3].text("id"), Some("3"));
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        assert_eq!(batches(&items(2), 0).count(), 2);
    }

    #[test]
    fn custom_transform_is_applied() {
        let stream = RecordStream::new(Cursor::new(items(3).into_bytes()), "item");
        let transform = |el: &Element| -> IngestResult<Record> {
            let mut record = Record::new();
            record.insert("upper", el.find_text("name", None, "").to_uppercase());
            Ok(record)
        };
        let all: Vec<Record> = Batches::new(stream, 2, Box::new(transform))
            .flat_map(|b| b.unwrap())
            .collect();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].text("upper"), Some("N2"));
    }

    #[test]
    fn transform_error_stops_iteration() {
        let stream = RecordStream::new(Cursor::new(items(5).into_bytes()), "item");
        let transform = |el: &Element| -> IngestResult<Record> {
            match el.attribute("id") {
                Some("3") => Err(IngestError::Transform("bad record 3".into())),
                _ => Ok(Record::new()),
            }
        };
        let mut it = Batches::new(stream, 2, Box::new(transform));
        assert_eq!(it.next().unwrap().unwrap().len(), 2);
        match it.next() {
            Some(Err(IngestError::Transform(msg))) => assert_eq!(msg, "bad record 3"),
            other => panic!("expected transform error, got {other:?}"),
        }
        assert!(it.next().is_none());
    }

    #[test]
    fn parse_error_is_yielded_once() {
        let mut it = batches("<catalog><item/><item>", 10);
        assert!(it.next().unwrap().unwrap_err().is_parse());
        assert!(it.next().is_none());
    }

    #[test]
    fn records_emitted_tracks_progress() {
        let mut it = batches(&items(3), 2);
        it.next();
        assert_eq!(it.records_emitted(), 2);
        it.next();
        assert_eq!(it.records_emitted(), 3);
    }
}
