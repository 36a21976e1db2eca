use ndarray::prelude::*;
use std::collections::BTreeMap;

use crate::bbox::BBox;
use crate::detection::Detection;

pub const DEFAULT_INPUT_SIZE: (i32, i32) = (640, 640);

#[derive(Debug, Clone)]
pub struct YoloDetectorConfig {
    /// Score floor applied before NMS; class and threshold filtering for
    /// counting happens later in the pipeline
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub input_size: (i32, i32),
}

impl YoloDetectorConfig {
    pub fn new(confidence_threshold: f32, iou_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            input_size: DEFAULT_INPUT_SIZE,
        }
    }
}

impl Default for YoloDetectorConfig {
    fn default() -> Self {
        Self::new(0.25, 0.45)
    }
}

/// Decodes a YOLOv8 output tensor of shape `[batch, 4 + classes, predictions]`.
///
/// Only the first batch is read. Boxes come out in model input pixels and are
/// scaled by `scale` (frame size / input size) back to frame pixels.
pub fn postprocess(
    view: ArrayView3<'_, f32>,
    config: &YoloDetectorConfig,
    scale: (f32, f32),
) -> Vec<Detection> {
    let shape = view.shape();
    if shape[0] == 0 || shape[1] <= 4 {
        return Vec::new();
    }

    let preds = view.index_axis(Axis(0), 0);
    let npreds = preds.shape()[1];
    let (sx, sy) = scale;

    // The bounding boxes grouped by (maximum) class index.
    let mut by_class: BTreeMap<i32, Vec<Detection>> = BTreeMap::new();

    for index in 0..npreds {
        let column = preds.index_axis(Axis(1), index);

        let mut class_index = -1;
        let mut confidence = 0.0;

        for (idx, val) in column.slice(s![4..]).iter().copied().enumerate() {
            if val > confidence {
                class_index = idx as i32;
                confidence = val;
            }
        }

        if class_index < 0 || confidence <= config.confidence_threshold {
            continue;
        }

        let bbox = BBox::xywh(
            column[0] * sx,
            column[1] * sy,
            column[2] * sx,
            column[3] * sy,
        )
        .as_ltrb();

        if !bbox.is_valid() {
            continue;
        }

        by_class.entry(class_index).or_default().push(Detection {
            bbox,
            confidence: confidence.min(1.0),
            class: class_index,
        });
    }

    let mut results = Vec::new();
    for (_, mut dets) in by_class {
        non_maximum_suppression(&mut dets, config.iou_threshold);
        results.append(&mut dets);
    }

    results
}

/// Greedy NMS: keeps the highest scoring box of every cluster overlapping
/// above `iou_threshold`. Leaves `dets` sorted by descending confidence.
pub fn non_maximum_suppression(dets: &mut Vec<Detection>, iou_threshold: f32) {
    dets.sort_unstable_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut retain = vec![true; dets.len()];
    for idx in 0..dets.len() {
        if !retain[idx] {
            continue;
        }

        for other in idx + 1..dets.len() {
            if retain[other] && dets[idx].iou(&dets[other]) > iou_threshold {
                retain[other] = false;
            }
        }
    }

    let mut flags = retain.into_iter();
    dets.retain(|_| flags.next().unwrap_or(false));
}

#[cfg(feature = "opencv")]
pub use self::dnn_model::YoloDetector;

#[cfg(feature = "opencv")]
mod dnn_model {
    use super::{postprocess, YoloDetectorConfig};
    use crate::detection::Detection;
    use crate::error::{Error, Result};
    use crate::Detecting;

    use log::debug;
    use ndarray::ArrayView3;
    use opencv::{
        core::{self, Mat, Vector},
        dnn,
        prelude::*,
    };

    /// YOLOv8 ONNX model run through the OpenCV DNN backend
    pub struct YoloDetector {
        net: dnn::Net,
        out_names: Vector<String>,
        config: YoloDetectorConfig,
    }

    impl YoloDetector {
        pub fn new(model_src: &str, config: YoloDetectorConfig) -> Result<Self> {
            let net = dnn::read_net_from_onnx(model_src)?;
            let out_names = net.get_unconnected_out_layers_names()?;

            Ok(Self {
                net,
                out_names,
                config,
            })
        }
    }

    impl Detecting<Mat> for YoloDetector {
        fn detect(&mut self, frame: &Mat) -> Result<Vec<Detection>> {
            let (in_w, in_h) = self.config.input_size;
            let blob = dnn::blob_from_image(
                frame,
                1.0 / 255.0,
                core::Size::new(in_w, in_h),
                core::Scalar::default(),
                true,
                false,
                core::CV_32F,
            )?;

            self.net.set_input(&blob, "", 1.0, core::Scalar::default())?;

            let mut outputs = Vector::<Mat>::new();
            self.net.forward(&mut outputs, &self.out_names)?;
            let output = outputs.get(0)?;

            let size = output.mat_size();
            let dims: &[i32] = &size;
            if dims.len() != 3 {
                return Err(Error::MalformedDetection(format!(
                    "unexpected model output shape {:?}",
                    dims
                )));
            }

            let shape = (dims[0] as usize, dims[1] as usize, dims[2] as usize);
            let view = ArrayView3::from_shape(shape, output.data_typed::<f32>()?)
                .map_err(|err| Error::MalformedDetection(err.to_string()))?;

            let scale = (
                frame.cols() as f32 / in_w as f32,
                frame.rows() as f32 / in_h as f32,
            );

            let dets = postprocess(view, &self.config, scale);
            debug!("detected {} objects", dets.len());

            Ok(dets)
        }
    }
}
