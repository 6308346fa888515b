use crate::reader::seek_target;
use crate::*;
use rstest::rstest;

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Wraps a `SliceReader`, counting calls and optionally refusing backward seeks or failing a
/// chosen read.
struct Counting<'a> {
    inner: SliceReader<'a>,
    len: u64,
    reads: usize,
    seeks: usize,
    backward: bool,
    fail_read: Option<usize>,
}

impl<'a> Counting<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            inner: SliceReader::new(data),
            len: data.len() as u64,
            reads: 0,
            seeks: 0,
            backward: true,
            fail_read: None,
        }
    }

    fn forward_only(data: &'a [u8]) -> Self {
        Self {
            backward: false,
            ..Self::new(data)
        }
    }

    /// Makes the `n`th call to `read` (counting from 1) fail.
    fn failing_at(self, n: usize) -> Self {
        Self {
            fail_read: Some(n),
            ..self
        }
    }
}

impl Stream for Counting<'_> {
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        self.seeks += 1;
        let pos = self.inner.tell();
        let target = seek_target(pos, self.len, offset, whence).min(self.len);
        if !self.backward && target < pos {
            return Err(Error::SeekBackward {
                from: pos,
                to: target,
            });
        }
        self.inner.seek(offset, whence)
    }

    fn tell(&self) -> u64 {
        self.inner.tell()
    }

    fn can_seek_backward(&self) -> bool {
        self.backward
    }
}

impl Reader for Counting<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.reads += 1;
        if self.fail_read == Some(self.reads) {
            return Err(std::io::Error::other("injected failure").into());
        }
        self.inner.read(buf)
    }
}

#[test]
fn large_source_default_capacity() {
    let data = pattern(65536);
    let mut r = BufferedReader::new(SliceReader::new(&data)).unwrap();
    assert_eq!(r.capacity(), 4096);

    let expected = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    assert_eq!(r.read_le::<u32>().unwrap(), expected);
    assert_eq!(r.seek(-4, Whence::End).unwrap(), 65532);
    assert_eq!(r.read_raw::<u8>().unwrap(), data[65532]);
    assert_eq!(r.read_at_most(64).unwrap(), data[65533..]);
    assert_eq!(r.tell(), 65536);
}

#[derive(Copy, Clone, Debug)]
enum Op {
    Read(usize),
    Seek(i64, Whence),
    Until(u8),
    Tell,
}

#[derive(Debug, PartialEq)]
enum Outcome {
    Bytes(Vec<u8>),
    Pos(u64),
}

const SCRIPT: &[Op] = &[
    Op::Read(3),
    Op::Read(10),
    Op::Tell,
    Op::Seek(-5, Whence::Current),
    Op::Read(20),
    Op::Until(50),
    Op::Tell,
    Op::Seek(90, Whence::Start),
    Op::Read(30),
    Op::Seek(-20, Whence::End),
    Op::Read(1),
    Op::Seek(10, Whence::Start),
    Op::Read(64),
    Op::Seek(0, Whence::Current),
    Op::Until(200),
    Op::Tell,
    Op::Seek(-1000, Whence::Current),
    Op::Read(2),
    Op::Seek(5, Whence::End),
    Op::Read(4),
    Op::Seek(40, Whence::Start),
    Op::Seek(-3, Whence::Current),
    Op::Read(8),
    Op::Seek(1, Whence::Current),
    Op::Read(0),
    Op::Until(99),
    Op::Read(150),
];

fn run<R: Reader>(r: &mut R) -> Vec<Outcome> {
    SCRIPT
        .iter()
        .map(|op| match *op {
            Op::Read(n) => Outcome::Bytes(r.read_at_most(n).unwrap()),
            Op::Seek(offset, whence) => Outcome::Pos(r.seek(offset, whence).unwrap()),
            Op::Until(delim) => Outcome::Bytes(r.read_until(delim).unwrap()),
            Op::Tell => Outcome::Pos(r.tell()),
        })
        .collect()
}

#[rstest]
fn same_results_as_unbuffered(#[values(1, 3, 8, 16, 99, 100, 101, 4096)] capacity: usize) {
    let data = pattern(100);
    let expected = run(&mut SliceReader::new(&data));
    let mut buffered = BufferedReader::with_capacity(SliceReader::new(&data), capacity).unwrap();
    assert_eq!(run(&mut buffered), expected);
}

#[rstest]
fn typed_reads_match_unbuffered(#[values(1, 2, 5, 64)] capacity: usize) {
    let data = pattern(64);
    let mut plain = SliceReader::new(&data);
    let mut r = BufferedReader::with_capacity(SliceReader::new(&data), capacity).unwrap();
    for _ in 0..4 {
        assert_eq!(r.read_be::<u16>().unwrap(), plain.read_be::<u16>().unwrap());
        assert_eq!(r.read_le::<u64>().unwrap(), plain.read_le::<u64>().unwrap());
        assert_eq!(r.read_le::<f32>().unwrap(), plain.read_le::<f32>().unwrap());
        assert_eq!(r.read_fixed::<u8>().unwrap(), plain.read_fixed::<u8>().unwrap());
    }
    assert_eq!(r.tell(), plain.tell());
    assert_eq!(r.read_to_end().unwrap(), plain.read_to_end().unwrap());
}

#[test]
fn reads_straddling_refills() {
    let data = pattern(64);
    let mut r = BufferedReader::with_capacity(Counting::new(&data), 8).unwrap();
    assert_eq!(r.get_ref().reads, 1);

    assert_eq!(r.read_exact(6).unwrap(), data[..6]);
    assert_eq!(r.get_ref().reads, 1);

    // One boundary: 2 bytes from the first window, 5 from a refilled one.
    assert_eq!(r.read_exact(7).unwrap(), data[6..13]);
    assert_eq!(r.get_ref().reads, 2);

    // Several boundaries: the remainder goes straight to the caller, then the window reloads.
    assert_eq!(r.read_exact(30).unwrap(), data[13..43]);
    assert_eq!(r.get_ref().reads, 4);
    assert_eq!(r.tell(), 43);
    assert_eq!(r.buffer(), &data[43..51]);

    assert_eq!(r.read_at_most(100).unwrap(), data[43..]);
    assert_eq!(r.get_ref().reads, 6);
    assert!(r.read_at_most(1).unwrap().is_empty());
    assert_eq!(r.get_ref().reads, 6);
    assert_eq!(r.get_ref().seeks, 0);
}

#[test]
fn seek_to_current_position_is_a_no_op() {
    let data = pattern(40);
    let mut r = BufferedReader::with_capacity(SliceReader::new(&data), 5).unwrap();
    assert_eq!(r.read_exact(7).unwrap(), data[..7]);
    assert_eq!(r.seek(0, Whence::Current).unwrap(), 7);
    assert_eq!(r.tell(), 7);
    assert_eq!(r.tell(), 7);
    assert_eq!(r.read_exact(3).unwrap(), data[7..10]);
}

#[test]
fn seek_past_end_reads_nothing() {
    let data = pattern(40);
    let mut r = BufferedReader::with_capacity(SliceReader::new(&data), 16).unwrap();
    assert_eq!(r.seek(1000, Whence::Start).unwrap(), 40);
    assert!(r.read_at_most(10).unwrap().is_empty());
    assert_eq!(r.try_read_le::<u32>().unwrap(), None);
    assert!(matches!(r.read_be::<u16>(), Err(Error::EndOfStream)));

    assert_eq!(r.seek(-2, Whence::End).unwrap(), 38);
    assert_eq!(r.read_at_most(10).unwrap(), data[38..]);
}

#[test]
fn seek_within_window_needs_no_io() {
    let data = pattern(64);
    let mut r = BufferedReader::with_capacity(Counting::new(&data), 16).unwrap();

    assert_eq!(r.seek(10, Whence::Start).unwrap(), 10);
    assert_eq!(r.read_raw::<u8>().unwrap(), data[10]);
    assert_eq!(r.seek(-8, Whence::Current).unwrap(), 3);
    assert_eq!(r.read_raw::<u8>().unwrap(), data[3]);
    assert_eq!(r.seek(16, Whence::Start).unwrap(), 16);
    assert_eq!(r.get_ref().reads, 1);
    assert_eq!(r.get_ref().seeks, 0);

    assert_eq!(r.seek(40, Whence::Start).unwrap(), 40);
    assert_eq!(r.get_ref().seeks, 1);
    assert_eq!(r.get_ref().reads, 2);
    assert_eq!(r.read_raw::<u8>().unwrap(), data[40]);

    assert_eq!(r.seek(2, Whence::Start).unwrap(), 2);
    assert_eq!(r.get_ref().seeks, 2);
    assert_eq!(r.get_ref().reads, 3);
    assert_eq!(r.read_raw::<u8>().unwrap(), data[2]);
}

#[test]
fn forward_only_inner() {
    let data = pattern(64);
    let mut r = BufferedReader::with_capacity(Counting::forward_only(&data), 16).unwrap();
    assert!(!r.can_seek_backward());

    assert_eq!(r.read_exact(12).unwrap(), data[..12]);
    // Backward, but inside the window.
    assert_eq!(r.seek(-10, Whence::Current).unwrap(), 2);
    assert_eq!(r.read_exact(4).unwrap(), data[2..6]);
    assert_eq!(r.get_ref().seeks, 0);

    assert_eq!(r.seek(30, Whence::Start).unwrap(), 30);
    assert!(matches!(
        r.seek(-3, Whence::Current),
        Err(Error::SeekBackward { from: 46, to: 27 })
    ));
    assert!(matches!(
        r.seek(0, Whence::Start),
        Err(Error::SeekBackward { .. })
    ));

    // The failed seeks left the window alone.
    assert_eq!(r.tell(), 30);
    assert_eq!(r.read_raw::<u8>().unwrap(), data[30]);
    assert_eq!(r.seek(45, Whence::Start).unwrap(), 45);
    assert_eq!(r.read_exact(4).unwrap(), data[45..49]);
}

#[test]
fn read_to_end_without_backward_seek() {
    let data = pattern(64);
    let mut r = BufferedReader::with_capacity(Counting::forward_only(&data), 16).unwrap();
    assert_eq!(r.read_exact(5).unwrap(), data[..5]);
    assert_eq!(r.read_to_end().unwrap(), data[5..]);
    assert_eq!(r.get_ref().seeks, 0);
}

#[test]
fn read_until_across_refills() {
    let text = b"alpha;a-much-longer-field-than-one-window;tail";
    let mut r = BufferedReader::with_capacity(SliceReader::new(text), 8).unwrap();
    assert_eq!(r.read_until(b';').unwrap(), b"alpha;");
    assert_eq!(
        r.read_until(b';').unwrap(),
        b"a-much-longer-field-than-one-window;"
    );
    assert_eq!(r.read_until(b';').unwrap(), b"tail");
    assert!(r.read_until(b';').unwrap().is_empty());
    assert_eq!(r.tell(), text.len() as u64);
}

#[test]
fn read_until_at_window_edges() {
    // Delimiter is the last byte of the first window.
    let mut r = BufferedReader::with_capacity(SliceReader::new(b"abcdefg;hij"), 8).unwrap();
    assert_eq!(r.read_until(b';').unwrap(), b"abcdefg;");
    assert_eq!(r.tell(), 8);
    assert_eq!(r.read_until(b';').unwrap(), b"hij");

    // Delimiter is the first byte of the second window.
    let mut r = BufferedReader::with_capacity(SliceReader::new(b"abcdefgh;ij"), 8).unwrap();
    assert_eq!(r.read_until(b';').unwrap(), b"abcdefgh;");
    assert_eq!(r.tell(), 9);
    assert_eq!(r.read_str_until(b';', false).unwrap(), "ij");
}

#[test]
fn read_until_missing_delimiter() {
    let data = pattern(16);
    let mut r = BufferedReader::with_capacity(Counting::new(&data), 8).unwrap();
    assert_eq!(r.read_raw::<u8>().unwrap(), 0);
    assert_eq!(r.read_until(0xff).unwrap(), data[1..]);
    // Two full windows, then an empty refill.
    assert_eq!(r.get_ref().reads, 3);
    assert_eq!(r.tell(), 16);
}

#[test]
fn null_terminated_strings() {
    let mut w = VecStream::new();
    for s in ["", "one", "a somewhat longer string", "x"] {
        w.write_null_terminated_str(s).unwrap();
    }
    let bytes = w.into_inner();

    let mut r = BufferedReader::with_capacity(SliceReader::new(&bytes), 4).unwrap();
    assert_eq!(r.read_null_terminated_str().unwrap(), "");
    assert_eq!(r.read_null_terminated_str().unwrap(), "one");
    assert_eq!(
        r.read_null_terminated_str().unwrap(),
        "a somewhat longer string"
    );
    assert_eq!(r.read_null_terminated_str().unwrap(), "x");
    assert_eq!(r.tell(), bytes.len() as u64);
}

#[test]
fn failed_refill_keeps_position() {
    let data = pattern(32);
    let mut r = BufferedReader::with_capacity(Counting::new(&data).failing_at(2), 4).unwrap();
    assert_eq!(r.read_exact(2).unwrap(), data[..2]);

    assert!(matches!(r.read_exact(4), Err(Error::Io(_))));
    assert_eq!(r.tell(), 2);

    assert_eq!(r.read_exact(4).unwrap(), data[2..6]);
    assert_eq!(r.tell(), 6);
}

#[test]
fn failed_reload_after_seek() {
    let data = pattern(32);
    let mut r = BufferedReader::with_capacity(Counting::new(&data).failing_at(2), 4).unwrap();

    assert!(matches!(r.seek(20, Whence::Start), Err(Error::Io(_))));
    assert_eq!(r.tell(), 20);
    assert!(r.buffer().is_empty());

    // Seeking again reloads the window.
    assert_eq!(r.seek(20, Whence::Start).unwrap(), 20);
    assert_eq!(r.read_exact(3).unwrap(), data[20..23]);
}

#[test]
fn read_after_failed_reload_retries() {
    let data = pattern(32);
    let mut r = BufferedReader::with_capacity(Counting::new(&data).failing_at(2), 4).unwrap();
    assert!(r.seek(20, Whence::Start).is_err());

    // Not end of stream: the next read reloads the window where the seek left it.
    assert_eq!(r.read_at_most(3).unwrap(), data[20..23]);
    assert_eq!(r.tell(), 23);
    assert_eq!(r.read_to_end().unwrap(), data[23..]);
}

#[test]
fn read_until_after_failed_reload_retries() {
    let text = b"abcdefgh;ij";
    let mut r = BufferedReader::with_capacity(Counting::new(text).failing_at(2), 4).unwrap();
    assert!(r.seek(2, Whence::Current).is_ok());
    assert!(r.seek(6, Whence::Start).is_err());
    assert_eq!(r.read_until(b';').unwrap(), b"gh;");
}

#[test]
fn bypass_read_survives_failed_reload() {
    let data = pattern(32);
    let mut r = BufferedReader::with_capacity(Counting::new(&data).failing_at(3), 4).unwrap();

    // The window holds 4 bytes, the other 6 come straight from the inner reader, and only
    // the reload after them fails.
    assert_eq!(r.read_exact(10).unwrap(), data[..10]);
    assert_eq!(r.tell(), 10);
    assert_eq!(r.read_at_most(5).unwrap(), data[10..15]);
    assert_eq!(r.tell(), 15);
}

#[test]
fn end_seek_inside_short_window() {
    let data = pattern(10);
    let mut r = BufferedReader::with_capacity(ForwardReader::new(&data[..]), 64).unwrap();
    assert_eq!(r.read_exact(8).unwrap(), data[..8]);

    assert_eq!(r.seek(-4, Whence::End).unwrap(), 6);
    assert_eq!(r.read_exact(4).unwrap(), data[6..]);
    assert_eq!(r.seek(-100, Whence::End).unwrap(), 0);
    assert_eq!(r.seek(3, Whence::End).unwrap(), 10);
}

#[test]
fn end_seek_needs_no_io_once_end_is_buffered() {
    let data = pattern(40);
    let mut r = BufferedReader::with_capacity(Counting::new(&data), 16).unwrap();

    // The end of the stream is not yet in the window.
    assert_eq!(r.seek(-2, Whence::End).unwrap(), 38);
    assert_eq!(r.get_ref().seeks, 1);
    assert_eq!(r.get_ref().reads, 2);

    assert_eq!(r.seek(-1, Whence::End).unwrap(), 39);
    assert_eq!(r.seek(0, Whence::End).unwrap(), 40);
    assert_eq!(r.get_ref().seeks, 1);
    assert_eq!(r.get_ref().reads, 2);

    // Before the window, the inner reader resolves it.
    assert_eq!(r.seek(-30, Whence::End).unwrap(), 10);
    assert_eq!(r.read_raw::<u8>().unwrap(), data[10]);
    assert_eq!(r.get_ref().seeks, 2);
}

#[test]
fn read_until_failed_refill_keeps_position() {
    let text = b"abcdefghijkl;mn";
    let mut r = BufferedReader::with_capacity(Counting::new(text).failing_at(3), 4).unwrap();

    // Two windows are scanned before the third refill fails.
    assert!(matches!(r.read_until(b';'), Err(Error::Io(_))));
    assert_eq!(r.tell(), 0);
    assert_eq!(r.buffer(), b"abcdefgh");

    assert_eq!(r.read_until(b';').unwrap(), b"abcdefghijkl;");
    assert_eq!(r.tell(), 13);
    assert_eq!(r.read_at_most(10).unwrap(), b"mn");
}

#[test]
fn read_until_failed_first_refill_keeps_position() {
    let text = b"abcdefghijkl;mn";
    let mut r = BufferedReader::with_capacity(Counting::new(text).failing_at(2), 4).unwrap();
    assert_eq!(r.read_raw::<u8>().unwrap(), b'a');

    assert!(r.read_until(b';').is_err());
    assert_eq!(r.tell(), 1);
    assert_eq!(r.read_until(b';').unwrap(), b"bcdefghijkl;");
}

#[test]
fn construction_failure_propagates() {
    let data = pattern(8);
    assert!(matches!(
        BufferedReader::with_capacity(Counting::new(&data).failing_at(1), 4),
        Err(Error::Io(_))
    ));
}

#[test]
fn into_inner_is_at_window_end() {
    let data = pattern(32);
    let mut r = BufferedReader::with_capacity(SliceReader::new(&data), 8).unwrap();
    assert_eq!(r.read_exact(3).unwrap(), data[..3]);
    assert_eq!(r.tell(), 3);
    let inner = r.into_inner();
    assert_eq!(inner.tell(), 8);
}

#[test]
fn wraps_mutable_reference() {
    let data = pattern(32);
    let mut plain = SliceReader::new(&data);
    {
        let mut r = BufferedReader::with_capacity(&mut plain, 10).unwrap();
        assert_eq!(r.read_le::<u16>().unwrap(), u16::from_le_bytes([data[0], data[1]]));
    }
    assert_eq!(plain.tell(), 10);
}
