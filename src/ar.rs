//! Reading and writing the SysV `ar` envelope that every `.deb` is wrapped in:
//! `debian-binary`, `control.tar*`, `data.tar*`, in that order.
use crate::error::*;
use std::io::{Cursor, Read};

/// Reads every member of an `ar` archive into memory, in file order.
pub fn read_ar(bytes: &[u8]) -> DtResult<Vec<(String, Vec<u8>)>> {
    let mut archive = ar::Archive::new(Cursor::new(bytes));
    let mut members = Vec::new();
    while let Some(entry) = archive.next_entry() {
        let mut entry = entry.map_err(|_| DebtoolError::MalformedContainer("truncated or invalid ar header"))?;
        let name = String::from_utf8_lossy(entry.header().identifier())
            .trim_end_matches('/')
            .to_string();
        let mut data = Vec::with_capacity(entry.header().size() as usize);
        entry.read_to_end(&mut data).map_err(|_| DebtoolError::MalformedContainer("truncated ar member body"))?;
        members.push((name, data));
    }
    if members.is_empty() {
        return Err(DebtoolError::MalformedContainer("not an ar archive (bad magic or empty file)"));
    }
    Ok(members)
}

/// Writes an `ar` archive containing exactly the given members, in order,
/// with the fixed metadata (`uid=gid=0`, `mtime=0`, mode `0100644`) dpkg
/// itself uses so the resulting bytes are reproducible.
pub fn write_ar(members: &[(String, Vec<u8>)]) -> DtResult<Vec<u8>> {
    let mut builder = ar::Builder::new(Vec::new());
    for (name, data) in members {
        let mut header = ar::Header::new(name.clone().into_bytes(), data.len() as u64);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_mode(0o100644);
        builder.append(&header, &mut Cursor::new(data))?;
    }
    Ok(builder.into_inner()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_members_in_order() {
        let members = vec![
            ("debian-binary".to_string(), b"2.0\n".to_vec()),
            ("control.tar.gz".to_string(), b"fake control bytes".to_vec()),
            ("data.tar.gz".to_string(), b"fake data bytes".to_vec()),
        ];
        let bytes = write_ar(&members).unwrap();
        let read_back = read_ar(&bytes).unwrap();
        assert_eq!(read_back, members);
    }

    #[test]
    fn rejects_garbage() {
        assert!(read_ar(b"not an ar file at all").is_err());
    }
}
