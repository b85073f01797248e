mod common;

use common::*;
use dxf::Drawing;
use dxf::entities::EntityType;
use rastervec::export::save_to_dxf;

fn read_lines(path: &std::path::Path) -> Vec<[f64; 4]> {
    let drawing = Drawing::load_file(path).unwrap();
    drawing
        .entities()
        .map(|entity| match &entity.specific {
            EntityType::Line(line) => [line.p1.x, line.p1.y, line.p2.x, line.p2.y],
            other => panic!("unexpected entity {other:?}"),
        })
        .collect()
}

#[test]
fn export_flips_y_per_endpoint() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("out").join("result.dxf");
    let result = DetectionResult::new(vec![[0.0, 0.0, 10.0, 0.0], [5.0, 5.0, 5.0, 15.0]], 40, 20);

    save_to_dxf(&result, &path).unwrap();

    assert_eq!(
        read_lines(&path),
        vec![[0.0, 20.0, 10.0, 20.0], [5.0, 15.0, 5.0, 5.0]]
    );
}

#[test]
fn empty_result_writes_a_valid_drawing() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("result.dxf");
    save_to_dxf(&DetectionResult::empty(10, 10), &path).unwrap();
    assert!(read_lines(&path).is_empty());
}

#[test]
fn detected_segments_survive_export_in_order() {
    let (_dir, image) = create_test_drawing();
    let out = tempfile::TempDir::new().unwrap();
    let path = out.path().join("lsd_classic").join("result.dxf");
    let registry = Registry::with_builtin_detectors().unwrap();
    let mut detector = registry.get("lsd_classic").unwrap();

    let result = detector.process(&image, &path).unwrap();

    let written = read_lines(&path);
    assert_eq!(written.len(), result.lines.len());
    let h = result.image_height as f64;
    for (line, entity) in result.lines.iter().zip(&written) {
        assert!((entity[0] - line[0]).abs() < 1e-6);
        assert!((entity[1] - (h - line[1])).abs() < 1e-6);
        assert!((entity[2] - line[2]).abs() < 1e-6);
        assert!((entity[3] - (h - line[3])).abs() < 1e-6);
    }
}
