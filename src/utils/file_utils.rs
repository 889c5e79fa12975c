use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::Path;

/// Bytes of an input file, memory mapped when it has any content
pub enum FileBytes {
    Mapped(Mmap),
    Empty,
}

impl AsRef<[u8]> for FileBytes {
    fn as_ref(&self) -> &[u8] {
        match self {
            FileBytes::Mapped(mmap) => &mmap[..],
            FileBytes::Empty => &[],
        }
    }
}

/// Read a binary file using memory mapping for improved performance
/// This is more efficient for large files as it doesn't load the entire file into RAM
pub fn read_binary_file_mmap(path: impl AsRef<Path>) -> io::Result<FileBytes> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(FileBytes::Empty);
    }
    // Safety: The file is not modified while the mmap is active
    let mmap = unsafe { Mmap::map(&file) }?;
    Ok(FileBytes::Mapped(mmap))
}
