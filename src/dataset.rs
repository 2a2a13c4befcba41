use crate::errors::EvalError;
use globwalk::DirEntry;
use image::imageops::FilterType;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tch::{Kind, Tensor};

const SUPPORTED_FILES: [&str; 9] = [
    "bmp", "jpg", "jpeg", "png", "ppm", "pgm", "tif", "tiff", "webp",
];

/// A labelled image on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub path: PathBuf,
    pub label: i64,
}

/// Images grouped by class directory, labelled by the sorted position of
/// their class name.
#[derive(Debug)]
pub struct ImageFolder {
    classes: Vec<String>,
    samples: Vec<Sample>,
    input_size: u32,
}

impl ImageFolder {
    pub fn new<P: AsRef<Path>>(root: P, input_size: u32) -> Result<ImageFolder, EvalError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(EvalError::MissingRoot(root.to_path_buf()));
        }

        let mut classes = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                classes.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        classes.sort();
        if classes.is_empty() {
            return Err(EvalError::NoClasses(root.to_path_buf()));
        }
        if classes.len() > 2 {
            return Err(EvalError::NotBinary(classes.len(), classes));
        }

        let mut samples = Vec::new();
        for (label, class) in classes.iter().enumerate() {
            samples.extend(
                find_images(&root.join(class))?
                    .into_iter()
                    .map(|path| Sample {
                        path,
                        label: label as i64,
                    }),
            );
        }
        if samples.is_empty() {
            return Err(EvalError::NoImages(root.to_path_buf()));
        }

        Ok(ImageFolder {
            classes,
            samples,
            input_size,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Loads sample `index` and applies the eval transform.
    /// Returns `(image [3, H, W], label, path)`.
    pub fn get(&self, index: usize) -> Result<(Tensor, i64, &Path), EvalError> {
        let sample = self
            .samples
            .get(index)
            .ok_or(EvalError::IndexOutOfRange {
                index,
                len: self.samples.len(),
            })?;
        let image = load_image(&sample.path, self.input_size)?;
        Ok((image, sample.label, sample.path.as_path()))
    }
}

/// Recursively lists the images under `dir`, ordered by path.
fn find_images(dir: &Path) -> Result<Vec<PathBuf>, EvalError> {
    // "*.{ext1,ext2,...}"
    let pattern = format!("*.{{{}}}", SUPPORTED_FILES.join(","));
    let walker = globwalk::GlobWalkerBuilder::from_patterns(dir, &[pattern])
        .case_insensitive(true)
        .follow_links(true)
        .sort_by(|p1: &DirEntry, p2: &DirEntry| p1.path().cmp(p2.path()))
        .build()?;

    let mut paths = Vec::new();
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// Output size after resizing the shorter side to `size`, keeping the aspect ratio.
pub fn resized_dims(width: u32, height: u32, size: u32) -> (u32, u32) {
    if width <= height {
        let long = (size as u64 * height as u64 / width as u64) as u32;
        (size, long)
    } else {
        let long = (size as u64 * width as u64 / height as u64) as u32;
        (long, size)
    }
}

/// Decodes an image, resizes its shorter side to `input_size` and
/// normalizes it to [-1, 1] in CHW layout.
pub fn load_image(path: &Path, input_size: u32) -> Result<Tensor, EvalError> {
    let rgb = image::open(path)
        .map_err(|source| EvalError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    let (width, height) = resized_dims(rgb.width(), rgb.height(), input_size);
    let resized = image::imageops::resize(&rgb, width, height, FilterType::Triangle);

    let tensor = Tensor::from_slice(resized.as_raw())
        .view([height as i64, width as i64, 3])
        .permute([2, 0, 1])
        .to_kind(Kind::Float)
        / 255.0;
    Ok(normalize(&tensor))
}

/// Per-channel normalization with mean 0.5 and std 0.5.
pub fn normalize(tensor: &Tensor) -> Tensor {
    (tensor - 0.5) / 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_image(path: &Path, width: u32, height: u32, value: u8) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
            .save(path)
            .unwrap();
    }

    fn binary_folder() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_image(&dir.path().join("0/b.png"), 8, 6, 0);
        write_image(&dir.path().join("0/a.png"), 8, 6, 0);
        write_image(&dir.path().join("1/nested/c.jpg"), 6, 8, 255);
        fs::write(dir.path().join("1/notes.txt"), "skip me").unwrap();
        dir
    }

    #[test]
    fn labels_follow_sorted_class_names() {
        let dir = binary_folder();
        let dataset = ImageFolder::new(dir.path(), 4).unwrap();
        assert_eq!(dataset.classes(), ["0", "1"]);
        assert_eq!(dataset.len(), 3);

        let names: Vec<_> = dataset
            .samples()
            .iter()
            .map(|s| (s.path.file_name().unwrap().to_str().unwrap(), s.label))
            .collect();
        assert_eq!(names, [("a.png", 0), ("b.png", 0), ("c.jpg", 1)]);
    }

    #[test]
    fn get_applies_eval_transform() {
        let dir = binary_folder();
        let dataset = ImageFolder::new(dir.path(), 4).unwrap();

        let (black, label, _) = dataset.get(0).unwrap();
        assert_eq!(label, 0);
        assert_eq!(black.size(), [3, 4, 5]);
        assert!((black.max().double_value(&[]) + 1.0).abs() < 1e-6);

        let (white, label, path) = dataset.get(2).unwrap();
        assert_eq!(label, 1);
        assert!(path.ends_with("nested/c.jpg"));
        assert_eq!(white.size(), [3, 5, 4]);
        assert!(white.min().double_value(&[]) > 0.9);
    }

    #[test]
    fn extension_match_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("0")).unwrap();
        GrayImage::from_pixel(4, 4, Luma([0]))
            .save(dir.path().join("0/gray.pgm"))
            .unwrap();
        write_image(&dir.path().join("1/LOUD.PNG"), 4, 4, 255);
        write_image(&dir.path().join("1/tile.ppm"), 4, 4, 255);
        fs::create_dir(dir.path().join("1/fake.png")).unwrap();

        let dataset = ImageFolder::new(dir.path(), 4).unwrap();
        let names: Vec<_> = dataset
            .samples()
            .iter()
            .map(|s| (s.path.file_name().unwrap().to_str().unwrap(), s.label))
            .collect();
        assert_eq!(names, [("gray.pgm", 0), ("LOUD.PNG", 1), ("tile.ppm", 1)]);

        let (tile, _, _) = dataset.get(2).unwrap();
        assert_eq!(tile.size(), [3, 4, 4]);
    }

    #[test]
    fn get_out_of_range_is_an_error() {
        let dir = binary_folder();
        let dataset = ImageFolder::new(dir.path(), 4).unwrap();
        assert!(matches!(
            dataset.get(3),
            Err(EvalError::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn resize_keeps_aspect_ratio() {
        assert_eq!(resized_dims(800, 600, 400), (533, 400));
        assert_eq!(resized_dims(600, 800, 400), (400, 533));
        assert_eq!(resized_dims(400, 400, 400), (400, 400));
    }

    #[test]
    fn rejects_bad_folders() {
        let missing = ImageFolder::new("/definitely/not/here", 4);
        assert!(matches!(missing, Err(EvalError::MissingRoot(_))));

        let empty = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageFolder::new(empty.path(), 4),
            Err(EvalError::NoClasses(_))
        ));

        fs::create_dir(empty.path().join("0")).unwrap();
        assert!(matches!(
            ImageFolder::new(empty.path(), 4),
            Err(EvalError::NoImages(_))
        ));

        let dir = binary_folder();
        write_image(&dir.path().join("2/d.png"), 4, 4, 10);
        assert!(matches!(
            ImageFolder::new(dir.path(), 4),
            Err(EvalError::NotBinary(3, _))
        ));
    }
}
