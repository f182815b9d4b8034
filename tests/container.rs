use rsrc_coff::object_file::{FileHeader, RelocationRecord, SectionHeader, StringTable, SymbolRecord};
use rsrc_coff::resources::{DataDescriptor, RT_GROUP_ICON, RT_ICON, RT_MANIFEST};
use rsrc_coff::{ObjectFile, RawSection, ResourceSection, Section, Serializable};

fn resources() -> ResourceSection {
    let mut section = ResourceSection::new();
    section.add_by_id(RT_ICON, 1, vec![0x11; 40]).unwrap();
    section.add_by_id(RT_ICON, 2, vec![0x22; 24]).unwrap();
    section.add_by_name(RT_GROUP_ICON, "APPICON", vec![0x33; 20]).unwrap();
    section
        .add_by_id(RT_MANIFEST, 1, b"<assembly/>".to_vec())
        .unwrap();
    section
}

fn object(architecture: &str) -> ObjectFile {
    let mut object = ObjectFile::new();
    object.set_architecture(architecture).unwrap();
    object
        .add_section(RawSection::new(".long_section_name", vec![1, 2, 3, 4, 5]))
        .unwrap();
    object.add_section(resources()).unwrap();
    object
}

fn write(object: &ObjectFile) -> Vec<u8> {
    let mut out = Vec::new();
    let written = object.write_to(&mut out).unwrap();
    assert_eq!(written, out.len() as u64);
    assert_eq!(written, object.size().unwrap() as u64);
    out
}

fn read<T: Serializable>(data: &[u8], offset: usize) -> T {
    T::deserialize(&data[offset..]).unwrap().1
}

#[test]
fn container_layout_is_consistent() {
    let object = object("amd64");
    let out = write(&object);

    let header: FileHeader = read(&out, 0);
    assert_eq!(header.section_count, 2);
    assert_eq!(header.symbol_count, 2);

    let long: SectionHeader = read(&out, FileHeader::SIZE);
    let rsrc: SectionHeader = read(&out, FileHeader::SIZE + SectionHeader::SIZE);
    assert_eq!(&rsrc.name, b".rsrc\0\0\0");
    assert_eq!(long.raw_data_size, 5);
    assert_eq!(long.data_pointer, 100);
    assert_eq!(rsrc.data_pointer, 105);
    assert_eq!(rsrc.raw_data_size, object.section(".rsrc").unwrap().size());
    assert_eq!(long.relocation_count, 0);
    assert_eq!(rsrc.relocation_count, 4);
    assert_eq!(rsrc.relocation_pointer, rsrc.data_pointer + rsrc.raw_data_size);
    assert_eq!(
        header.symbol_table_pointer as usize,
        rsrc.relocation_pointer as usize + 4 * RelocationRecord::SIZE
    );

    // Every relocation targets the resource section's own symbol and a data
    // descriptor whose payload lies inside the section.
    let section_data = &out[rsrc.data_pointer as usize..][..rsrc.raw_data_size as usize];
    for i in 0..4 {
        let relocation: RelocationRecord =
            read(&out, rsrc.relocation_pointer as usize + i * RelocationRecord::SIZE);
        assert_eq!(relocation.symbol_index, 1);
        assert_eq!(relocation.kind, 0x03);
        let descriptor: DataDescriptor = read(section_data, relocation.virtual_address as usize);
        assert!(descriptor.data_rva + descriptor.size <= rsrc.raw_data_size);
    }

    let symbols = header.symbol_table_pointer as usize;
    let first: SymbolRecord = read(&out, symbols);
    let second: SymbolRecord = read(&out, symbols + SymbolRecord::SIZE);
    assert_eq!(first.section_number, 1);
    assert_eq!(second.section_number, 2);
    assert_eq!(&second.name, b".rsrc\0\0\0");
    assert_eq!(second.storage_class, 3);

    let table = &out[symbols + 2 * SymbolRecord::SIZE..];
    let (size, _) = StringTable::deserialize(table).unwrap();
    assert_eq!(size, table.len());
    let offset = long.string_table_offset().unwrap();
    assert_eq!(first.name, SymbolRecord::long_name(offset));
    let start = offset as usize;
    assert_eq!(&table[start..start + 19], b".long_section_name\0");
}

#[test]
fn architecture_only_changes_relocation_types() {
    let amd64 = write(&object("amd64"));
    let arm64 = write(&object("arm64"));
    let i386 = write(&object("i386"));
    assert_eq!(amd64.len(), arm64.len());
    assert_eq!(amd64.len(), i386.len());

    let rsrc: SectionHeader = read(&amd64, FileHeader::SIZE + SectionHeader::SIZE);
    let type_fields: Vec<usize> = (0..rsrc.relocation_count as usize)
        .flat_map(|i| {
            let at = rsrc.relocation_pointer as usize + i * RelocationRecord::SIZE + 8;
            [at, at + 1]
        })
        .collect();

    for (other, code) in [(&arm64, 0x02u16), (&i386, 0x07u16)] {
        for (at, (a, b)) in amd64.iter().zip(other.iter()).enumerate() {
            if !type_fields.contains(&at) {
                assert_eq!(a, b, "byte {at} differs");
            }
        }
        for pair in type_fields.chunks(2) {
            assert_eq!(u16::from_le_bytes([other[pair[0]], other[pair[1]]]), code);
        }
    }
}

#[test]
fn writes_are_repeatable() {
    let object = object("i386");
    assert_eq!(write(&object), write(&object));
}
