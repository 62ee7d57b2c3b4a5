//! Image Queries

/// 列出已生成图像查询
#[derive(Debug, Clone, Default)]
pub struct ListImages {
    /// 先清理文件已不存在的记录
    pub verify: bool,
}

/// 当前模型信息查询
#[derive(Debug, Clone)]
pub struct GetModelInfo;
