//! Parsers for the CSV that PowerShell's `ConvertTo-Csv` produces from CIM
//! queries.
//!
//! Kept free of platform calls so they are tested everywhere.

#![cfg_attr(not(windows), allow(dead_code))]

use super::{Disk, DiskKind, MediaClass};
use std::collections::HashMap;

/// Query listing physical disks
pub(crate) const DISK_DRIVE_QUERY: &str = "Get-CimInstance -ClassName Win32_DiskDrive | Select-Object Index,DeviceID,Model,Size,MediaType,SerialNumber,BytesPerSector | ConvertTo-Csv -NoTypeInformation";

/// Query mapping disk numbers to drive letters
pub(crate) const PARTITION_QUERY: &str =
    "Get-Partition | Select-Object DiskNumber,DriveLetter | ConvertTo-Csv -NoTypeInformation";

/// Query listing volumes
pub(crate) const VOLUME_QUERY: &str = "Get-CimInstance -ClassName Win32_Volume | Select-Object DeviceID,DriveLetter,Label,Capacity,DriveType | ConvertTo-Csv -NoTypeInformation";

/// Parse a CSV line handling quoted fields and doubled quotes
pub(crate) fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Parse CSV into rows keyed by header
///
/// Rows whose field count differs from the header are skipped.
pub(crate) fn parse_csv(csv: &str) -> Vec<HashMap<String, String>> {
    let mut lines = csv.lines().map(str::trim).filter(|l| !l.is_empty());

    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers = parse_csv_line(header_line);

    lines
        .map(parse_csv_line)
        .filter(|fields| fields.len() == headers.len())
        .map(|fields| headers.iter().cloned().zip(fields).collect())
        .collect()
}

fn field<'a>(row: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    row.get(name).map(String::as_str).filter(|s| !s.is_empty())
}

fn number<T: std::str::FromStr>(row: &HashMap<String, String>, name: &str) -> Option<T> {
    field(row, name).and_then(|s| s.parse().ok())
}

/// Parse `Win32_DiskDrive` rows into physical disks, keyed by disk index
///
/// Drives without media report no size and are kept with size zero.
pub(crate) fn parse_disk_drives(csv: &str) -> Vec<(u32, Disk)> {
    parse_csv(csv)
        .iter()
        .filter_map(|row| {
            let path = field(row, "DeviceID")?;
            let index = number(row, "Index").unwrap_or(0);
            let media_type = field(row, "MediaType").unwrap_or_default();

            let mut disk = Disk::new(path, DiskKind::Physical)
                .with_model(field(row, "Model").unwrap_or_default())
                .with_serial(field(row, "SerialNumber").map(|s| s.trim().to_string()))
                .with_size(number(row, "Size").unwrap_or(0));
            disk.media = MediaClass::from_media_type(media_type);
            disk.media_type = media_type.to_string();
            if let Some(sector_size) = number(row, "BytesPerSector").filter(|&s: &u32| s > 0) {
                disk.sector_size = sector_size;
            }

            Some((index, disk))
        })
        .collect()
}

/// Parse `Get-Partition` rows into disk number → mount points
pub(crate) fn parse_partition_letters(csv: &str) -> HashMap<u32, Vec<String>> {
    let mut letters: HashMap<u32, Vec<String>> = HashMap::new();

    for row in parse_csv(csv) {
        let Some(disk) = number::<u32>(&row, "DiskNumber") else {
            continue;
        };
        let Some(letter) = field(&row, "DriveLetter").and_then(|l| l.chars().next()) else {
            continue;
        };
        if letter.is_ascii_alphabetic() {
            letters.entry(disk).or_default().push(format!("{letter}:\\"));
        }
    }

    letters
}

/// Media type for a `Win32_Volume.DriveType` value, `None` for volumes that
/// are not local block storage
fn volume_media_type(drive_type: u32) -> Option<&'static str> {
    match drive_type {
        0 => Some("Unknown"),
        2 => Some("Removable Disk"),
        3 => Some("Local Disk"),
        _ => None,
    }
}

/// The `{GUID}` part of a `\\?\Volume{GUID}\` device id
fn volume_guid(device_id: &str) -> Option<String> {
    let start = device_id.find('{')?;
    let end = device_id[start..].find('}')? + start;
    Some(device_id[start..=end].to_string())
}

/// Parse `Win32_Volume` rows into volumes
///
/// Network, optical and RAM volumes are skipped. The volume GUID serves as
/// serial number because it lives in the partition table and survives the
/// volume being overwritten.
pub(crate) fn parse_volumes(csv: &str) -> Vec<Disk> {
    parse_csv(csv)
        .iter()
        .filter_map(|row| {
            let device_id = field(row, "DeviceID")?;
            let media_type = volume_media_type(number(row, "DriveType").unwrap_or(0))?;
            let letter = field(row, "DriveLetter");

            let path = match letter {
                Some(letter) => format!("\\\\.\\{letter}"),
                None => device_id.trim_end_matches('\\').to_string(),
            };

            let mut disk = Disk::new(path, DiskKind::Volume)
                .with_model(field(row, "Label").unwrap_or_default())
                .with_serial(volume_guid(device_id))
                .with_size(number(row, "Capacity").unwrap_or(0));
            disk.media = MediaClass::from_media_type(media_type);
            disk.media_type = media_type.to_string();

            if let Some(letter) = letter {
                disk = disk.with_mount_point(format!("{letter}\\"));
            }

            Some(disk)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- csv tests ----

    #[test]
    fn test_parse_csv_line_quoted() {
        assert_eq!(
            parse_csv_line(r#""0","\\.\PHYSICALDRIVE0","Samsung, SSD""#),
            vec!["0", r"\\.\PHYSICALDRIVE0", "Samsung, SSD"]
        );
    }

    #[test]
    fn test_parse_csv_line_doubled_quote() {
        assert_eq!(
            parse_csv_line(r#""My ""USB"" stick","""#),
            vec![r#"My "USB" stick"#, ""]
        );
    }

    #[test]
    fn test_parse_csv_skips_ragged_rows() {
        let rows = parse_csv("\"A\",\"B\"\n\"1\",\"2\"\n\"3\"\n\n\"4\",\"5\"\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["A"], "4");
    }

    #[test]
    fn test_parse_csv_empty() {
        assert!(parse_csv("").is_empty());
        assert!(parse_csv("\"A\",\"B\"").is_empty());
    }

    // ---- disk drive tests ----

    const DISK_CSV: &str = r#""Index","DeviceID","Model","Size","MediaType","SerialNumber","BytesPerSector"
"0","\\.\PHYSICALDRIVE0","Samsung SSD 970 EVO","500105249280","Fixed hard disk media","0025_3852_81B1_2F4E.","512"
"1","\\.\PHYSICALDRIVE1","SanDisk Cruzer Blade USB Device","15631122432","Removable Media","  4C530001230517105223","512"
"2","\\.\PHYSICALDRIVE2","Generic- SD/MMC USB Device","","","",""
"#;

    #[test]
    fn test_parse_disk_drives() {
        let disks = parse_disk_drives(DISK_CSV);
        assert_eq!(disks.len(), 3);

        let (index, ssd) = &disks[0];
        assert_eq!(*index, 0);
        assert_eq!(ssd.path, r"\\.\PHYSICALDRIVE0");
        assert_eq!(ssd.media, MediaClass::Fixed);
        assert_eq!(ssd.size, 500_105_249_280);

        let (_, stick) = &disks[1];
        assert_eq!(stick.media, MediaClass::Removable);
        assert_eq!(stick.media_type, "Removable Media");
        assert_eq!(stick.serial.as_deref(), Some("4C530001230517105223"));
    }

    #[test]
    fn test_parse_disk_drives_reader_without_card() {
        let disks = parse_disk_drives(DISK_CSV);
        let (_, reader) = &disks[2];
        assert_eq!(reader.size, 0);
        assert_eq!(reader.serial, None);
        assert_eq!(reader.media, MediaClass::Unknown);
        assert_eq!(reader.media_type, "");
        assert_eq!(reader.sector_size, 512);
    }

    // ---- partition tests ----

    #[test]
    fn test_parse_partition_letters() {
        let csv = "\"DiskNumber\",\"DriveLetter\"\n\"0\",\"\"\n\"0\",\"C\"\n\"1\",\"E\"\n\"1\",\"F\"\n";
        let letters = parse_partition_letters(csv);
        assert_eq!(letters[&0], vec!["C:\\"]);
        assert_eq!(letters[&1], vec!["E:\\", "F:\\"]);
    }

    // ---- volume tests ----

    #[test]
    fn test_parse_volumes() {
        let csv = r#""DeviceID","DriveLetter","Label","Capacity","DriveType"
"\\?\Volume{1b2c3d4e-0000-0000-0000-100000000000}\","C:","Windows","255380074496","3"
"\\?\Volume{9f8e7d6c-0000-0000-0000-000000000001}\","E:","BACKUP","15627976704","2"
"\\?\Volume{0a0b0c0d-0000-0000-0000-000000000002}\","D:","","","5"
"\\?\Volume{77777777-0000-0000-0000-000000000003}\","","Recovery","529530880","3"
"#;
        let volumes = parse_volumes(csv);
        assert_eq!(volumes.len(), 3);

        let system = &volumes[0];
        assert_eq!(system.path, r"\\.\C:");
        assert!(system.is_system);
        assert_eq!(system.media, MediaClass::Fixed);

        let usb = &volumes[1];
        assert_eq!(usb.kind, DiskKind::Volume);
        assert_eq!(usb.model, "BACKUP");
        assert_eq!(
            usb.serial.as_deref(),
            Some("{9f8e7d6c-0000-0000-0000-000000000001}")
        );
        assert_eq!(usb.media, MediaClass::Removable);
        assert_eq!(usb.mount_points, vec!["E:\\"]);
        assert!(!usb.is_system);

        let hidden = &volumes[2];
        assert_eq!(
            hidden.path,
            r"\\?\Volume{77777777-0000-0000-0000-000000000003}"
        );
        assert!(hidden.mount_points.is_empty());
    }

    #[test]
    fn test_volume_guid() {
        assert_eq!(volume_guid(r"\\?\Volume{abc}\").as_deref(), Some("{abc}"));
        assert_eq!(volume_guid("no guid"), None);
    }
}
