//! Application-side reader of received UART bytes

use std::io;

use crate::queue::RxConsumer;

/// The single consumer of bytes written by the peer
///
/// Reads never wait for data: an empty queue yields `None` or zero bytes.
#[derive(Debug)]
pub struct UartReader {
    rx: RxConsumer,
}

impl UartReader {
    pub(crate) fn new(rx: RxConsumer) -> Self {
        Self { rx }
    }

    /// Number of bytes ready to read
    pub fn available(&self) -> usize {
        self.rx.len()
    }

    /// Read one byte, `None` if nothing is queued
    pub fn read(&self) -> Option<u8> {
        self.rx.pop()
    }

    /// Fill `buf` with up to `min(buf.len(), available())` bytes
    ///
    /// Returns the number of bytes copied.
    pub fn read_into(&self, buf: &mut [u8]) -> usize {
        let count = buf.len().min(self.available());
        let mut read = 0;
        for slot in buf.iter_mut().take(count) {
            match self.rx.pop() {
                Some(byte) => {
                    *slot = byte;
                    read += 1;
                }
                None => break,
            }
        }
        read
    }

    /// Drain everything currently queued
    pub fn read_available(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.available());
        while let Some(byte) = self.rx.try_pop() {
            bytes.push(byte);
        }
        bytes
    }

    pub fn capacity(&self) -> usize {
        self.rx.capacity()
    }
}

impl io::Read for UartReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::rx_queue;
    use std::io::Read;

    #[test]
    fn test_read_into_is_bounded_by_available() {
        let (producer, consumer) = rx_queue(16);
        let reader = UartReader::new(consumer);
        producer.push_all(b"hello");

        let mut buf = [0u8; 3];
        assert_eq!(reader.read_into(&mut buf), 3);
        assert_eq!(&buf, b"hel");

        let mut buf = [0u8; 8];
        assert_eq!(reader.read_into(&mut buf), 2);
        assert_eq!(&buf[..2], b"lo");
        assert_eq!(reader.read_into(&mut buf), 0);
        assert_eq!(reader.read(), None);
    }

    #[test]
    fn test_io_read() {
        let (producer, consumer) = rx_queue(16);
        let mut reader = UartReader::new(consumer);
        producer.push_all(b"abc");

        let mut buf = [0u8; 16];
        assert_eq!(Read::read(&mut reader, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(Read::read(&mut reader, &mut buf).unwrap(), 0);
    }
}
