//! リクエスト・レスポンスボディのストリーム

use std::io::{self, Cursor, Read, Seek, SeekFrom};

use bytes::Bytes;

/// 共有バイト列上の読み取り・シーク可能なストリーム
///
/// 読み取った側は必ず `rewind` で先頭へ戻すこと。
#[derive(Debug, Clone, Default)]
pub struct BodyStream {
    cursor: Cursor<Bytes>,
}

impl BodyStream {
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self {
            cursor: Cursor::new(content.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// 現在位置から末尾までを読み取る
    pub fn read_remaining(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.cursor.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// 先頭へ戻す
    pub fn rewind(&mut self) {
        self.cursor.set_position(0);
    }

    /// 位置に関係なく全体を返す（ストリーム位置は変えない）
    pub fn contents(&self) -> Bytes {
        self.cursor.get_ref().clone()
    }

    /// 全体を文字列として返す（不正なUTF-8は置換）
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.cursor.get_ref()).into_owned()
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }
}

impl Read for BodyStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for BodyStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_and_rewind() {
        let mut stream = BodyStream::new("hello");
        assert_eq!(stream.read_remaining().unwrap(), b"hello");
        assert_eq!(stream.position(), 5);
        assert!(stream.read_remaining().unwrap().is_empty());

        stream.rewind();
        assert_eq!(stream.position(), 0);
        assert_eq!(stream.read_remaining().unwrap(), b"hello");
    }

    #[test]
    fn test_contents_independent_of_position() {
        let mut stream = BodyStream::new(b"abc".to_vec());
        let mut one = [0u8; 1];
        stream.read_exact(&mut one).unwrap();
        assert_eq!(&stream.contents()[..], b"abc");
        assert_eq!(stream.to_string_lossy(), "abc");
        assert_eq!(stream.len(), 3);
        assert!(BodyStream::empty().is_empty());
    }
}
