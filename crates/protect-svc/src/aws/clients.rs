//! AWS SDK client construction.

use aws_config::BehaviorVersion;

/// Build an S3 client from the standard AWS credential and region chain.
///
/// `endpoint_url` points the client at an S3-compatible store (MinIO,
/// LocalStack); path-style addressing is forced in that case because such
/// stores rarely serve virtual-hosted bucket names.
pub async fn s3_client(endpoint_url: Option<&str>) -> aws_sdk_s3::Client {
    let config = aws_config::defaults(BehaviorVersion::latest()).load().await;

    let mut builder = aws_sdk_s3::config::Builder::from(&config);
    if let Some(url) = endpoint_url {
        builder = builder.endpoint_url(url).force_path_style(true);
    }
    aws_sdk_s3::Client::from_conf(builder.build())
}
