//! End-to-end training over a generated Parquet dataset.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Float32Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use tempfile::tempdir;

use deepctr_core::SolverBuilder;
use deepctr_data::DataReaderParams;
use deepctr_optimizer::OptimizerConfig;
use deepctr_training::launch::run_in_train_thread;
use deepctr_training::{FitParams, Model, ModelError};

const DENSE_DIM: usize = 2;
const SLOT_SIZES: [u64; 2] = [20, 10];

fn write_data_file(path: &Path, num_rows: usize) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("label", DataType::Float32, false),
        Field::new("dense_0", DataType::Float32, false),
        Field::new("dense_1", DataType::Float32, false),
        Field::new("cat_0", DataType::Int64, false),
        Field::new("cat_1", DataType::Int64, false),
    ]));

    // Make the label depend on the features so training has signal.
    let cat0: Vec<i64> = (0..num_rows).map(|i| (i as i64 * 7) % 20).collect();
    let cat1: Vec<i64> = (0..num_rows).map(|i| (i as i64 * 3) % 10).collect();
    let labels: Vec<f32> = cat0
        .iter()
        .map(|&k| if k % 2 == 0 { 1.0 } else { 0.0 })
        .collect();
    let dense0: Vec<f32> = labels.iter().map(|&y| y * 0.5 + 0.1).collect();
    let dense1: Vec<f32> = (0..num_rows).map(|i| (i % 5) as f32 * 0.1).collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float32Array::from(labels)),
            Arc::new(Float32Array::from(dense0)),
            Arc::new(Float32Array::from(dense1)),
            Arc::new(Int64Array::from(cat0)),
            Arc::new(Int64Array::from(cat1)),
        ],
    )
    .unwrap();

    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

fn write_file_list(dir: &Path, files: usize, rows_per_file: usize) -> String {
    let mut list = format!("{files}\n");
    for i in 0..files {
        let path = dir.join(format!("part{i}.parquet"));
        write_data_file(&path, rows_per_file);
        list.push_str(&format!("{}\n", path.display()));
    }
    let list_path = dir.join("_file_list.txt");
    let mut f = File::create(&list_path).unwrap();
    f.write_all(list.as_bytes()).unwrap();
    list_path.to_string_lossy().into_owned()
}

fn write_graph(dir: &Path) -> String {
    let graph = r#"{
        "layers": [
            {"name": "data", "type": "Data", "dense_dim": 2, "slot_num": 2},
            {"name": "sparse_embedding1", "type": "SparseEmbedding", "embedding_vec_size": 4},
            {"name": "concat1", "type": "Concat"},
            {"name": "multicross1", "type": "MultiCross", "num_layers": 3},
            {"name": "fc1", "type": "InnerProduct", "num_output": 16},
            {"name": "relu1", "type": "ReLU"},
            {"name": "fc2", "type": "InnerProduct", "num_output": 1},
            {"name": "loss", "type": "BinaryCrossEntropyLoss"}
        ]
    }"#;
    let path = dir.join("dcn.json");
    std::fs::write(&path, graph).unwrap();
    path.to_string_lossy().into_owned()
}

fn build_model(list: &str) -> Model {
    let solver = SolverBuilder::new()
        .max_eval_batches(4)
        .batchsize(8)
        .batchsize_eval(8)
        .vvgpu(vec![vec![0]])
        .i64_input_key(true)
        .repeat_dataset(true)
        .build()
        .unwrap();
    let reader = DataReaderParams::parquet(vec![list.to_string()], list.to_string())
        .with_slot_size_array(SLOT_SIZES.to_vec());
    Model::new(solver, reader, OptimizerConfig::adam())
}

#[test]
fn test_full_training_run() {
    let dir = tempdir().unwrap();
    let list = write_file_list(dir.path(), 2, 32);
    let graph = write_graph(dir.path());
    let prefix = dir.path().join("dcn").to_string_lossy().into_owned();

    let mut model = build_model(&list);
    model.construct_from_json(&graph, true).unwrap();

    let summary = model.summary().unwrap();
    assert!(summary.contains("sparse_embedding1"));
    assert!(summary.contains("multicross1"));
    assert!(summary.contains("fc2"));

    model.compile().unwrap();
    let report = model
        .fit(&FitParams::new(40, 10, 20, 20, &prefix))
        .unwrap();

    assert_eq!(report.iterations_run, 40);
    assert!(report.final_loss.is_finite());
    assert_eq!(report.evals.len(), 2);
    assert_eq!(report.snapshots.len(), 2);
    for path in &report.snapshots {
        assert!(path.exists(), "missing snapshot {}", path.display());
    }
    // The matching sparse and latest files exist too.
    assert!(dir.path().join("dcn_sparse_20.model").exists());
    assert!(dir.path().join("dcn.latest").exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("dcn.latest"))
            .unwrap()
            .trim(),
        "40"
    );
}

#[test]
fn test_training_learns_the_data() {
    let dir = tempdir().unwrap();
    let list = write_file_list(dir.path(), 1, 64);
    let graph = write_graph(dir.path());

    let mut model = build_model(&list);
    model.construct_from_json(&graph, true).unwrap();
    model.compile().unwrap();

    let report = model
        .fit(&FitParams::new(500, 100, 250, 0, "unused"))
        .unwrap();

    assert_eq!(report.iterations_run, 500);
    // The labels are a deterministic function of cat_0, so the model
    // should separate the classes well after a few hundred steps.
    let last_eval = report.evals.last().unwrap();
    assert!(
        last_eval.auc.unwrap_or(0.0) > 0.8,
        "expected AUC above 0.8, got {:?}",
        last_eval.auc
    );
}

#[test]
fn test_fit_before_compile_fails() {
    let dir = tempdir().unwrap();
    let list = write_file_list(dir.path(), 1, 16);
    let graph = write_graph(dir.path());

    let mut model = build_model(&list);
    model.construct_from_json(&graph, true).unwrap();

    let err = model.fit(&FitParams::new(1, 1, 0, 0, "x")).unwrap_err();
    assert!(matches!(err, ModelError::NotCompiled));
}

#[test]
fn test_summary_before_construct_fails() {
    let dir = tempdir().unwrap();
    let list = write_file_list(dir.path(), 1, 16);

    let model = build_model(&list);
    assert!(matches!(model.summary(), Err(ModelError::NotConstructed)));
}

#[test]
fn test_fit_without_dense_network_fails() {
    let dir = tempdir().unwrap();
    let list = write_file_list(dir.path(), 1, 16);
    let graph = write_graph(dir.path());

    let mut model = build_model(&list);
    model.construct_from_json(&graph, false).unwrap();
    model.compile().unwrap();

    let err = model.fit(&FitParams::new(1, 1, 0, 0, "x")).unwrap_err();
    assert!(matches!(err, ModelError::MissingDenseNetwork));
}

#[test]
fn test_training_inside_worker_thread() {
    let dir = tempdir().unwrap();
    let list = write_file_list(dir.path(), 1, 32);
    let graph = write_graph(dir.path());

    let report = run_in_train_thread(0, move || {
        let mut model = build_model(&list);
        model.construct_from_json(&graph, true)?;
        model.compile()?;
        model.fit(&FitParams::new(10, 5, 0, 0, "unused"))
    })
    .unwrap()
    .unwrap();

    assert_eq!(report.iterations_run, 10);
}
