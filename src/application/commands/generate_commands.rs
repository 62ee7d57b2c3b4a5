//! Generation Commands

use crate::domain::generation::GenerationParams;

/// 生成图像命令（Web 单次请求，可能返回多张图）
#[derive(Debug, Clone, Default)]
pub struct GenerateImages {
    pub prompt: String,
    /// 上传目录中的源图像文件名
    pub image: Option<String>,
    pub model: Option<String>,
    /// 未设置的字段使用服务端默认值
    pub params: GenerationParams,
}

/// 上传源图像命令
#[derive(Debug, Clone)]
pub struct UploadImage {
    /// 客户端提供的原始文件名（只取扩展名）
    pub original_name: String,
    pub data: Vec<u8>,
}
