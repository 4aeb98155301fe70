//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub fn write(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// IFC model with `count` walls on one storey. Walls whose index is in
/// `broken` point at a representation that does not exist.
pub fn wall_model(count: usize, broken: &[usize]) -> String {
    let mut data = String::from(
        "#1=IFCPROJECT('p',$,'Depot',$,$,$,$,$,$);
#2=IFCORGANIZATION($,'Depot Works',$,$,$);
#3=IFCAPPLICATION(#2,'0.8','IfcOpenShell','IfcOpenShell');
#10=IFCCARTESIANPOINT((0.,0.,0.));
#11=IFCAXIS2PLACEMENT3D(#10,$,$);
#12=IFCLOCALPLACEMENT($,#11);
#13=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,4.,0.2);
#14=IFCDIRECTION((0.,0.,1.));
#15=IFCEXTRUDEDAREASOLID(#13,#11,#14,3.);
#16=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#15));
#17=IFCPRODUCTDEFINITIONSHAPE($,$,(#16));
#30=IFCBUILDINGSTOREY('s1',$,'Ground Floor',$,$,$,$,$,.ELEMENT.,0.);
",
    );

    let mut walls = Vec::new();
    for i in 0..count {
        let id = 100 + i;
        let shape = if broken.contains(&i) { 9999 } else { 17 };
        writeln!(data, "#{id}=IFCWALL('w{i}',$,'Wall {i}',$,$,#12,#{shape},$,$);").unwrap();
        walls.push(format!("#{id}"));
    }
    writeln!(
        data,
        "#31=IFCRELCONTAINEDINSPATIALSTRUCTURE('r1',$,$,$,({}),#30);",
        walls.join(",")
    )
    .unwrap();

    ifc_file(&data)
}

pub fn ifc_file(data: &str) -> String {
    format!(
        "ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [CoordinationView]'),'2;1');
FILE_NAME('depot.ifc','2024-06-12T09:15:00',('Sam Reyes'),('Depot Works'),'IfcOpenShell','IfcOpenShell','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
{data}ENDSEC;
END-ISO-10303-21;
"
    )
}

/// Compound document with a `SummaryInformation` stream carrying the
/// given title and application name, plus one opaque stream.
#[cfg(feature = "compound-doc")]
pub fn write_compound(dir: &Path, name: &str, title: &str, application: &str) -> PathBuf {
    use std::io::Write;

    let path = dir.join(name);
    let mut container = cfb::create(&path).unwrap();
    {
        let mut stream = container.create_stream("/\u{5}SummaryInformation").unwrap();
        stream
            .write_all(&summary_information(&[(0x02, title), (0x12, application)]))
            .unwrap();
    }
    {
        let mut stream = container.create_stream("/BasicFileInfo").unwrap();
        stream.write_all(b"opaque element data").unwrap();
    }
    container.flush().unwrap();
    path
}

/// Property set stream holding one section of `VT_LPSTR` properties.
fn summary_information(props: &[(u32, &str)]) -> Vec<u8> {
    let mut values = Vec::new();
    let mut offsets = Vec::new();
    let header_len = 8 + props.len() * 8;
    for (id, text) in props {
        offsets.push((*id, (header_len + values.len()) as u32));
        values.extend_from_slice(&0x1Eu32.to_le_bytes());
        values.extend_from_slice(&((text.len() + 1) as u32).to_le_bytes());
        values.extend_from_slice(text.as_bytes());
        values.push(0);
        while values.len() % 4 != 0 {
            values.push(0);
        }
    }

    let mut out = Vec::new();
    out.extend_from_slice(&0xFFFEu16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&48u32.to_le_bytes());
    out.extend_from_slice(&((header_len + values.len()) as u32).to_le_bytes());
    out.extend_from_slice(&(props.len() as u32).to_le_bytes());
    for (id, offset) in offsets {
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&offset.to_le_bytes());
    }
    out.extend_from_slice(&values);
    out
}
